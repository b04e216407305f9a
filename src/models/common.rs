use serde::Deserialize;

use crate::errors::{AppError, FieldError};

/// Offset/limit window derived from `page` + `limit` query parameters.
/// `limit = None` binds as SQL `LIMIT NULL`, i.e. no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Pagination {
    /// Pages are zero-based. Both parameters must be given together or not at all.
    pub fn from_params(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        match (page, limit) {
            (None, None) => Ok(Pagination::default()),
            (Some(page), Some(limit)) => {
                let mut errors = Vec::new();
                if page < 0 {
                    errors.push(FieldError::new("page", "page must not be negative"));
                }
                if limit < 1 {
                    errors.push(FieldError::new("limit", "limit must be at least 1"));
                }
                if !errors.is_empty() {
                    return Err(AppError::Validation(errors));
                }
                let offset = page.checked_mul(limit).ok_or_else(|| {
                    AppError::Validation(vec![FieldError::new("page", "page is out of range for this limit")])
                })?;
                Ok(Pagination { limit: Some(limit), offset })
            }
            (Some(_), None) => Err(AppError::Validation(vec![FieldError::new(
                "limit",
                "limit is required when page is given",
            )])),
            (None, Some(_)) => Err(AppError::Validation(vec![FieldError::new(
                "page",
                "page is required when limit is given",
            )])),
        }
    }
}

/// `%term%` pattern for case-insensitive `ILIKE` matching, with LIKE
/// metacharacters escaped. Blank searches yield `None`.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// Query parameters shared by most list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub cohort_year: Option<i32>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn pagination(&self) -> Result<Pagination, AppError> {
        Pagination::from_params(self.page, self.limit)
    }

    pub fn pattern(&self) -> Option<String> {
        search_pattern(self.search.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_maps_page_to_offset() {
        let p = Pagination::from_params(Some(2), Some(10)).unwrap();
        assert_eq!(p, Pagination { limit: Some(10), offset: 20 });
        assert_eq!(Pagination::from_params(None, None).unwrap(), Pagination::default());
    }

    #[test]
    fn pagination_requires_both_params() {
        assert!(matches!(
            Pagination::from_params(Some(1), None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Pagination::from_params(None, Some(5)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Pagination::from_params(Some(0), Some(0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn pagination_rejects_offset_overflow() {
        match Pagination::from_params(Some(i64::MAX / 2), Some(4)) {
            Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "page"),
            other => panic!("expected a validation error, got {other:?}"),
        }
        let last = Pagination::from_params(Some(i64::MAX / 4), Some(4)).unwrap();
        assert_eq!(last.offset, (i64::MAX / 4) * 4);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("Team")).as_deref(), Some("%Team%"));
        assert_eq!(search_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }
}

/// Deserialize a field that distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`). Use with `#[serde(default, deserialize_with = ...)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Declare a fieldless enum stored as TEXT: serde by variant name, `as_str`,
/// `Display`, `FromStr` and `TryFrom<String>` (for `#[sqlx(try_from = "String")]`).
#[macro_export]
macro_rules! text_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(format!("'{}' is not a valid {}", other, stringify!($name))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

#[cfg(test)]
mod text_enum_tests {
    crate::text_enum! {
        enum Colour { Red, Green }
    }

    #[test]
    fn parses_and_prints_variant_names() {
        assert_eq!("Red".parse::<Colour>(), Ok(Colour::Red));
        assert_eq!(Colour::Green.to_string(), "Green");
        assert!(Colour::try_from("Blue".to_string()).is_err());
        assert_eq!(Colour::ALL.len(), 2);
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        #[derive(serde::Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "super::double_option")]
            adviser_id: Option<Option<i64>>,
        }
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"adviser_id": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"adviser_id": 4}"#).unwrap();
        assert_eq!(absent.adviser_id, None);
        assert_eq!(null.adviser_id, Some(None));
        assert_eq!(set.adviser_id, Some(Some(4)));
    }
}
