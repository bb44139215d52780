use serde::{Deserialize, Serialize};

use crate::AuditLogEntry;

/// Escape character used in LIKE patterns built from search terms.
pub const LIKE_ESCAPE: char = '\\';

/// Target of a fielded `field:value` search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    /// Causer name or email contains the value.
    User,
    /// Event equals the value or description contains it.
    Action,
    /// Subject type contains the value.
    SubjectType,
    /// Subject identifier contains the value.
    SubjectId,
    /// JSON text of the safe properties contains the value.
    Properties,
    /// Description contains the value.
    Description,
    /// Event equals the value.
    Event,
}

impl SearchField {
    /// Resolves a field token typed by the user.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "user" => Some(Self::User),
            "action" => Some(Self::Action),
            "subject" | "subject_type" => Some(Self::SubjectType),
            "id" | "subject_id" => Some(Self::SubjectId),
            "details" | "properties" => Some(Self::Properties),
            "description" => Some(Self::Description),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

/// Whether a predicate targets one field or every searchable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum SearchPredicateKind {
    /// `field:value` shorthand.
    Fielded(SearchField),
    /// Multi-term search over all fields.
    FreeText,
}

/// Predicate built from one search request.
///
/// Every term must match. For free text, a term matches when any searchable
/// field contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPredicate {
    /// Predicate mode.
    pub kind: SearchPredicateKind,
    /// Terms, never empty strings.
    pub terms: Vec<String>,
}

impl SearchPredicate {
    /// Returns the fielded target, if any.
    #[must_use]
    pub fn field(&self) -> Option<SearchField> {
        match self.kind {
            SearchPredicateKind::Fielded(field) => Some(field),
            SearchPredicateKind::FreeText => None,
        }
    }

    /// Evaluates the predicate against a stored entry.
    ///
    /// Substring comparisons are case-insensitive; event comparisons are exact.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.terms.iter().all(|term| match self.kind {
            SearchPredicateKind::Fielded(field) => field_matches(field, term, entry),
            SearchPredicateKind::FreeText => free_text_matches(term, entry),
        })
    }
}

/// Parses a raw search string into predicates.
///
/// A string with exactly one `:` whose left side is a known field token is a
/// fielded search. Anything else, including strings with two or more colons,
/// is free text. The colon count covers the whole string, quotes included.
/// Blank input yields no predicate.
#[must_use]
pub fn parse_search(raw: &str) -> Vec<SearchPredicate> {
    if let Some(predicate) = parse_fielded(raw) {
        return vec![predicate];
    }

    let terms = tokenize_terms(raw);
    if terms.is_empty() {
        return Vec::new();
    }

    vec![SearchPredicate {
        kind: SearchPredicateKind::FreeText,
        terms,
    }]
}

/// Splits free text into terms, keeping quoted phrases together.
///
/// `"..."` and `'...'` phrases form one term; other runs split on whitespace.
/// An unterminated or empty quote is read as part of a plain run.
#[must_use]
pub fn tokenize_terms(raw: &str) -> Vec<String> {
    let characters: Vec<char> = raw.chars().collect();
    let mut terms = Vec::new();
    let mut index = 0;

    while index < characters.len() {
        if characters[index].is_whitespace() {
            index += 1;
            continue;
        }

        let current = characters[index];
        if current == '"' || current == '\'' {
            let closing = characters[index + 1..]
                .iter()
                .position(|character| *character == current)
                .map(|offset| index + 1 + offset);

            if let Some(closing) = closing.filter(|closing| *closing > index + 1) {
                let phrase: String = characters[index + 1..closing].iter().collect();
                push_term(&mut terms, phrase);
                index = closing + 1;
                continue;
            }
        }

        let start = index;
        while index < characters.len() && !characters[index].is_whitespace() {
            index += 1;
        }
        push_term(&mut terms, characters[start..index].iter().collect());
    }

    terms
}

/// Escapes LIKE metacharacters so a term only ever matches literally.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for character in term.chars() {
        if matches!(character, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(character);
    }

    escaped
}

/// Builds the `%term%` substring pattern for a term.
#[must_use]
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

fn parse_fielded(raw: &str) -> Option<SearchPredicate> {
    if raw.matches(':').count() != 1 {
        return None;
    }

    let (field_token, value) = raw.split_once(':')?;
    let field = SearchField::from_token(&trim_token(field_token).to_lowercase())?;
    let value = trim_token(value);
    if value.is_empty() {
        return None;
    }

    Some(SearchPredicate {
        kind: SearchPredicateKind::Fielded(field),
        terms: vec![value.to_owned()],
    })
}

fn trim_token(token: &str) -> &str {
    token.trim_matches(|character: char| {
        character.is_whitespace() || character == '"' || character == '\''
    })
}

fn push_term(terms: &mut Vec<String>, term: String) {
    let term = term.trim();
    if !term.is_empty() {
        terms.push(term.to_owned());
    }
}

fn field_matches(field: SearchField, term: &str, entry: &AuditLogEntry) -> bool {
    match field {
        SearchField::User => causer_matches(term, entry),
        SearchField::Action => entry.event == term || contains(&entry.description, term),
        SearchField::SubjectType => contains(&entry.subject_type, term),
        SearchField::SubjectId => contains(&entry.subject_id, term),
        SearchField::Properties => contains(&entry.properties.searchable_text(), term),
        SearchField::Description => contains(&entry.description, term),
        SearchField::Event => entry.event == term,
    }
}

fn free_text_matches(term: &str, entry: &AuditLogEntry) -> bool {
    contains(&entry.description, term)
        || contains(&entry.event, term)
        || contains(&entry.subject_type, term)
        || contains(&entry.subject_id, term)
        || causer_matches(term, entry)
        || contains(&entry.properties.searchable_text(), term)
}

fn causer_matches(term: &str, entry: &AuditLogEntry) -> bool {
    entry.causer.as_ref().is_some_and(|causer| {
        contains(&causer.name, term)
            || causer
                .email
                .as_deref()
                .is_some_and(|email| contains(email, term))
    })
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
