use std::str::FromStr;

use audit_trail_core::AppError;
use audit_trail_domain::{SearchField, SearchPredicate, SearchPredicateKind, contains_pattern};
use sqlx::{Database, Encode, QueryBuilder, Type};

/// SQL flavour used to render audit search predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// Case-insensitive `ILIKE` with a `::text` JSON cast.
    #[default]
    Postgres,
    /// Plain `LIKE` with a `CAST(... AS CHAR)` JSON cast.
    Generic,
}

impl SqlDialect {
    /// Returns the configuration value of the dialect.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Generic => "generic",
        }
    }

    fn like_operator(self) -> &'static str {
        match self {
            Self::Postgres => " ILIKE ",
            Self::Generic => " LIKE ",
        }
    }

    fn properties_as_text(self) -> &'static str {
        match self {
            Self::Postgres => "properties::text",
            Self::Generic => "CAST(properties AS CHAR)",
        }
    }
}

impl FromStr for SqlDialect {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            "generic" | "mysql" => Ok(Self::Generic),
            other => Err(AppError::Validation(format!(
                "unknown search dialect '{other}'"
            ))),
        }
    }
}

const FREE_TEXT_COLUMNS: &[&str] = &[
    "description",
    "event",
    "subject_type",
    "subject_id",
    "causer_name",
    "causer_email",
];

/// Appends ` WHERE ...` for the predicates; nothing when no term is present.
///
/// Predicates and their terms are AND-combined. Every term is bound as an
/// escaped `%term%` pattern, never spliced into the SQL text.
pub fn push_search_where<'args, DB>(
    builder: &mut QueryBuilder<'args, DB>,
    dialect: SqlDialect,
    predicates: &[SearchPredicate],
) where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    let mut first = true;
    for predicate in predicates {
        for term in &predicate.terms {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;

            match predicate.kind {
                SearchPredicateKind::Fielded(field) => {
                    push_fielded_condition(builder, dialect, field, term);
                }
                SearchPredicateKind::FreeText => {
                    push_free_text_condition(builder, dialect, term);
                }
            }
        }
    }
}

fn push_fielded_condition<'args, DB>(
    builder: &mut QueryBuilder<'args, DB>,
    dialect: SqlDialect,
    field: SearchField,
    term: &str,
) where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    match field {
        SearchField::User => {
            builder.push('(');
            push_contains(builder, dialect, "causer_name", term);
            builder.push(" OR ");
            push_contains(builder, dialect, "causer_email", term);
            builder.push(')');
        }
        SearchField::Action => {
            builder.push('(');
            push_equals(builder, "event", term);
            builder.push(" OR ");
            push_contains(builder, dialect, "description", term);
            builder.push(')');
        }
        SearchField::SubjectType => push_contains(builder, dialect, "subject_type", term),
        SearchField::SubjectId => push_contains(builder, dialect, "subject_id", term),
        SearchField::Properties => {
            push_contains(builder, dialect, dialect.properties_as_text(), term);
        }
        SearchField::Description => push_contains(builder, dialect, "description", term),
        SearchField::Event => push_equals(builder, "event", term),
    }
}

fn push_free_text_condition<'args, DB>(
    builder: &mut QueryBuilder<'args, DB>,
    dialect: SqlDialect,
    term: &str,
) where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    builder.push('(');
    for column in FREE_TEXT_COLUMNS {
        push_contains(builder, dialect, column, term);
        builder.push(" OR ");
    }
    push_contains(builder, dialect, dialect.properties_as_text(), term);
    builder.push(')');
}

fn push_contains<'args, DB>(
    builder: &mut QueryBuilder<'args, DB>,
    dialect: SqlDialect,
    column: &str,
    term: &str,
) where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    builder.push(column);
    builder.push(dialect.like_operator());
    builder.push_bind(contains_pattern(term));
    builder.push(" ESCAPE '\\'");
}

fn push_equals<'args, DB>(builder: &mut QueryBuilder<'args, DB>, column: &str, term: &str)
where
    DB: Database,
    String: Encode<'args, DB> + Type<DB>,
{
    builder.push(column);
    builder.push(" = ");
    builder.push_bind(term.to_owned());
}
