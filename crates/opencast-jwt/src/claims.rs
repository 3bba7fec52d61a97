//! Opencast claim model
//!
//! A [`ClaimSet`] carries the identity, roles and resource ACLs that Opencast
//! reads from a JWT. ACL entries live in three buckets (event, series,
//! playlist) that are merged into the single `oc` wire claim under
//! `{prefix}:{identifier}` keys.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::Result;
use crate::errors::JwtError;
use crate::helpers::{numeric_date, timestamp_from_value};
use crate::types::{ResourceKind, domain};

/// One ACL entry: a resource identifier and the actions granted on it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclEntry {
    /// Resource identifier without its kind prefix
    pub identifier: String,
    /// Granted actions, e.g. `read` or `write`
    pub actions: Vec<String>,
}

impl AclEntry {
    /// Create an entry
    pub fn new<I, S>(identifier: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Claims understood by Opencast's JWT login
///
/// Setters mutate this value only; the handler clones a claim set before
/// filling in a default expiry, so a caller's instance is never changed by
/// issuing a token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimSet {
    expiry: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    subject: Option<String>,
    name: Option<String>,
    email: Option<String>,
    roles: Vec<String>,
    event_acls: Vec<AclEntry>,
    series_acls: Vec<AclEntry>,
    playlist_acls: Vec<AclEntry>,
}

impl ClaimSet {
    /// Empty claim set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the Opencast user the token logs in as
    ///
    /// `name` and `email` are written to the token only when `subject` is
    /// non-empty.
    pub fn set_identity(
        &mut self,
        subject: impl Into<String>,
        name: Option<&str>,
        email: Option<&str>,
    ) -> &mut Self {
        self.subject = Some(subject.into());
        self.name = name.map(str::to_string);
        self.email = email.map(str::to_string);
        self
    }

    /// Username (`sub`)
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Email address
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_expiry(&mut self, instant: DateTime<Utc>) -> &mut Self {
        self.expiry = Some(instant);
        self
    }

    pub fn has_expiry(&self) -> bool {
        self.expiry.is_some()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    pub fn set_not_before(&mut self, instant: DateTime<Utc>) -> &mut Self {
        self.not_before = Some(instant);
        self
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// Replace the role list; duplicates are dropped, first occurrence wins
    pub fn set_roles<I, S>(&mut self, roles: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.clear();
        for role in roles {
            let role = role.into();
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Append event ACL entries
    ///
    /// Entries accumulate across calls. Re-adding an identifier replaces its
    /// actions in place. Use [`ClaimSet::clear_acls`] first to start over.
    pub fn set_event_acls<I, K, A, S>(&mut self, acls: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_acls(ResourceKind::Event, acls)
    }

    /// Append series ACL entries (accumulating, see [`ClaimSet::set_event_acls`])
    pub fn set_series_acls<I, K, A, S>(&mut self, acls: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_acls(ResourceKind::Series, acls)
    }

    /// Append playlist ACL entries (accumulating, see [`ClaimSet::set_event_acls`])
    pub fn set_playlist_acls<I, K, A, S>(&mut self, acls: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_acls(ResourceKind::Playlist, acls)
    }

    /// Append ACL entries to the bucket for `kind`
    pub fn add_acls<I, K, A, S>(&mut self, kind: ResourceKind, acls: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (identifier, actions) in acls {
            self.push_acl(kind, AclEntry::new(identifier, actions));
        }
        self
    }

    /// Empty all three ACL buckets
    pub fn clear_acls(&mut self) -> &mut Self {
        self.event_acls.clear();
        self.series_acls.clear();
        self.playlist_acls.clear();
        self
    }

    /// Entries of one bucket, in insertion order
    pub fn acls(&self, kind: ResourceKind) -> &[AclEntry] {
        match kind {
            ResourceKind::Event => &self.event_acls,
            ResourceKind::Series => &self.series_acls,
            ResourceKind::Playlist => &self.playlist_acls,
        }
    }

    pub fn event_acls(&self) -> &[AclEntry] {
        &self.event_acls
    }

    pub fn series_acls(&self) -> &[AclEntry] {
        &self.series_acls
    }

    pub fn playlist_acls(&self) -> &[AclEntry] {
        &self.playlist_acls
    }

    /// Whether any bucket holds an entry
    pub fn has_acls(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .any(|kind| !self.acls(kind).is_empty())
    }

    /// The merged `oc` claim: event, then series, then playlist entries
    pub fn acl_claims(&self) -> Map<String, Value> {
        let mut oc = Map::new();
        for kind in ResourceKind::ALL {
            for entry in self.acls(kind) {
                oc.insert(
                    kind.composite_key(&entry.identifier),
                    Value::from(entry.actions.clone()),
                );
            }
        }
        oc
    }

    fn bucket_mut(&mut self, kind: ResourceKind) -> &mut Vec<AclEntry> {
        match kind {
            ResourceKind::Event => &mut self.event_acls,
            ResourceKind::Series => &mut self.series_acls,
            ResourceKind::Playlist => &mut self.playlist_acls,
        }
    }

    fn push_acl(&mut self, kind: ResourceKind, entry: AclEntry) {
        let bucket = self.bucket_mut(kind);
        match bucket.iter_mut().find(|e| e.identifier == entry.identifier) {
            Some(existing) => existing.actions = entry.actions,
            None => bucket.push(entry),
        }
    }

    /// Claim mapping ready to embed in a token
    ///
    /// Keys appear in the order `exp`, `sub`, `name`, `email`, `roles`, `oc`,
    /// `nbf`; empty values are left out.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SchemaError`] when no expiry is set or when both
    /// the roles and the ACL buckets are empty.
    pub fn to_wire_map(&self) -> Result<Map<String, Value>> {
        let expiry = self
            .expiry
            .ok_or_else(|| JwtError::schema("Expiration claim \"exp\" is required"))?;
        if self.roles.is_empty() && !self.has_acls() {
            return Err(JwtError::schema(
                "At least one of the \"roles\" or \"oc\" claims must be present",
            ));
        }

        let mut claims = Map::new();
        claims.insert(domain::EXP.to_string(), numeric_date(expiry));

        // name and email only describe the user named by sub
        if let Some(subject) = self.subject.as_deref().filter(|s| !s.is_empty()) {
            claims.insert(domain::SUB.to_string(), Value::from(subject));
            for (claim, value) in [(domain::NAME, &self.name), (domain::EMAIL, &self.email)] {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    claims.insert(claim.to_string(), Value::from(value));
                }
            }
        }

        if !self.roles.is_empty() {
            claims.insert(domain::ROLES.to_string(), Value::from(self.roles.clone()));
        }
        if self.has_acls() {
            claims.insert(domain::OC.to_string(), Value::Object(self.acl_claims()));
        }
        if let Some(not_before) = self.not_before {
            claims.insert(domain::NBF.to_string(), numeric_date(not_before));
        }

        Ok(claims)
    }

    /// Pretty-printed JSON of [`ClaimSet::to_wire_map`]
    ///
    /// # Errors
    ///
    /// Same schema errors as [`ClaimSet::to_wire_map`].
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_wire_map()?)?)
    }

    /// Rebuild a claim set from the decoded claims of a token
    ///
    /// Claims outside the Opencast set are ignored. `oc` keys with an unknown
    /// prefix are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SchemaError`] when `exp` is missing, when neither
    /// `roles` nor `oc` is present and non-empty, or when a claim has the
    /// wrong JSON type.
    pub fn from_parsed_claims(claims: &Map<String, Value>) -> Result<Self> {
        if claims.get(domain::EXP).is_none_or(Value::is_null) {
            return Err(JwtError::schema("Expiration claim \"exp\" is required"));
        }
        Self::from_map(claims)
    }

    /// Build a claim set from caller-supplied data
    ///
    /// Like [`ClaimSet::from_parsed_claims`] but `exp` may be absent, in which
    /// case the handler applies its default expiry at issue time.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SchemaError`] when neither `roles` nor `oc` is
    /// present and non-empty, or when a claim has the wrong JSON type.
    pub fn from_map(claims: &Map<String, Value>) -> Result<Self> {
        let roles_present = claims
            .get(domain::ROLES)
            .is_some_and(|roles| !is_empty_value(roles));
        let oc_present = claims
            .get(domain::OC)
            .is_some_and(|oc| !is_empty_value(oc));
        if !roles_present && !oc_present {
            return Err(JwtError::schema(
                "At least one of the \"roles\" or \"oc\" claims must be present",
            ));
        }

        let mut claim_set = Self::new();
        claim_set.expiry = optional_date(claims, domain::EXP)?;
        claim_set.not_before = optional_date(claims, domain::NBF)?;
        claim_set.subject = optional_string(claims, domain::SUB)?;
        if claim_set.subject.as_deref().is_some_and(|s| !s.is_empty()) {
            claim_set.name = optional_string(claims, domain::NAME)?;
            claim_set.email = optional_string(claims, domain::EMAIL)?;
        }

        if let Some(roles) = claims.get(domain::ROLES) {
            claim_set.set_roles(string_list(domain::ROLES, roles)?);
        }
        if let Some(oc) = claims.get(domain::OC) {
            for (key, actions) in oc_entries(oc)? {
                if let Some((kind, identifier)) = ResourceKind::split_composite_key(key) {
                    let actions = string_list(domain::OC, actions)?;
                    claim_set.push_acl(kind, AclEntry::new(identifier, actions));
                }
            }
        }

        Ok(claim_set)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn optional_date(claims: &Map<String, Value>, name: &str) -> Result<Option<DateTime<Utc>>> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => timestamp_from_value(value).map(Some).ok_or_else(|| {
            JwtError::schema(format!("Claim \"{name}\" is not a valid timestamp"))
        }),
    }
}

fn optional_string(claims: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(JwtError::schema(format!(
            "Claim \"{name}\" must be a string"
        ))),
    }
}

fn string_list(name: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| JwtError::schema(format!("Claim \"{name}\" must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                JwtError::schema(format!("Claim \"{name}\" must only contain strings"))
            })
        })
        .collect()
}

/// Flatten both accepted `oc` shapes into `(key, actions)` pairs
///
/// The canonical form is one object; older clients send a list of
/// single-entry objects.
fn oc_entries(oc: &Value) -> Result<Vec<(&str, &Value)>> {
    let invalid = || JwtError::schema("Claim \"oc\" must be an object of action lists");
    match oc {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
        Value::Array(items) => {
            let mut entries = Vec::new();
            for item in items {
                let map = item.as_object().ok_or_else(invalid)?;
                entries.extend(map.iter().map(|(k, v)| (k.as_str(), v)));
            }
            Ok(entries)
        }
        _ => Err(invalid()),
    }
}
