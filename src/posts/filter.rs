/// Search filter builder
///
/// Translates loosely-typed query parameters into a parameterized SQL
/// predicate over the posts table. Filterable fields live in a declarative
/// matcher table, so adding one is a data change, not new branching logic.
/// Values are always bound, never interpolated.
use std::collections::HashMap;

/// How a query parameter matches against its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive substring match ("cat" matches "bobcat")
    Substring,
    /// Comma-separated literal alternatives; matches on equality with any
    SetMembership,
    /// Set membership against a JSON array column
    SetMembershipJson,
}

/// One filterable field: query parameter name, column, matching mode
pub struct FilterField {
    pub param: &'static str,
    pub column: &'static str,
    pub mode: MatchMode,
}

/// The full set of recognized search parameters
pub const FILTER_FIELDS: &[FilterField] = &[
    FilterField { param: "title", column: "title", mode: MatchMode::Substring },
    FilterField { param: "scientificName", column: "scientific_name", mode: MatchMode::Substring },
    FilterField { param: "commonName", column: "common_name", mode: MatchMode::Substring },
    FilterField { param: "enclosureType", column: "enclosure_type", mode: MatchMode::Substring },
    FilterField { param: "recommendations", column: "recommendations", mode: MatchMode::Substring },
    FilterField { param: "animalType", column: "animal_type", mode: MatchMode::SetMembership },
    FilterField { param: "trackerType", column: "tracker_type", mode: MatchMode::SetMembership },
    FilterField { param: "attachmentType", column: "attachment_type", mode: MatchMode::SetMembership },
    FilterField { param: "dataTypes", column: "data_types", mode: MatchMode::SetMembershipJson },
];

#[derive(Debug, Clone)]
enum Clause {
    Contains {
        column: &'static str,
        needle: String,
    },
    AnyOf {
        column: &'static str,
        values: Vec<String>,
    },
    AnyOfJson {
        column: &'static str,
        values: Vec<String>,
    },
}

/// A compiled filter: the logical AND of every supplied field predicate
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    clauses: Vec<Clause>,
}

impl SearchFilter {
    /// Build a filter from raw query parameters
    ///
    /// Absent parameters impose no constraint; zero parameters yield the
    /// unconstrained filter. Unrecognized parameters are ignored for
    /// forward compatibility, but logged so typos are observable.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut clauses = Vec::new();

        for field in FILTER_FIELDS {
            let Some(raw) = params.get(field.param) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }

            let clause = match field.mode {
                MatchMode::Substring => Clause::Contains {
                    column: field.column,
                    needle: escape_like(&raw.to_lowercase()),
                },
                MatchMode::SetMembership => {
                    let values = split_alternatives(raw);
                    if values.is_empty() {
                        continue;
                    }
                    Clause::AnyOf { column: field.column, values }
                }
                MatchMode::SetMembershipJson => {
                    let values = split_alternatives(raw);
                    if values.is_empty() {
                        continue;
                    }
                    Clause::AnyOfJson { column: field.column, values }
                }
            };
            clauses.push(clause);
        }

        for key in params.keys() {
            if !FILTER_FIELDS.iter().any(|f| f.param == key) {
                tracing::debug!(param = %key, "ignoring unrecognized search parameter");
            }
        }

        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the filter as an SQL condition plus its bind values
    ///
    /// Returns an empty string for the unconstrained filter. The condition
    /// uses anonymous `?` placeholders in bind order.
    pub fn condition(&self) -> (String, Vec<String>) {
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut binds = Vec::new();

        for clause in &self.clauses {
            match clause {
                Clause::Contains { column, needle } => {
                    parts.push(format!(
                        "LOWER({}) LIKE '%' || ? || '%' ESCAPE '\\'",
                        column
                    ));
                    binds.push(needle.clone());
                }
                Clause::AnyOf { column, values } => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    parts.push(format!("{} IN ({})", column, placeholders));
                    binds.extend(values.iter().cloned());
                }
                Clause::AnyOfJson { column, values } => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    parts.push(format!(
                        "EXISTS (SELECT 1 FROM json_each(posts.{}) WHERE json_each.value IN ({}))",
                        column, placeholders
                    ));
                    binds.extend(values.iter().cloned());
                }
            }
        }

        (parts.join(" AND "), binds)
    }
}

/// Split a comma-separated parameter into literal alternatives
fn split_alternatives(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_params_build_unconstrained_filter() {
        let filter = SearchFilter::from_params(&HashMap::new());
        assert!(filter.is_empty());

        let (cond, binds) = filter.condition();
        assert!(cond.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn test_unrecognized_params_are_ignored() {
        let filter = SearchFilter::from_params(&params(&[("titel", "fox")]));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_substring_clause() {
        let filter = SearchFilter::from_params(&params(&[("title", "Fox")]));
        let (cond, binds) = filter.condition();

        assert!(cond.contains("LOWER(title) LIKE"));
        // Needle is lowercased for the case-insensitive comparison
        assert_eq!(binds, vec!["fox".to_string()]);
    }

    #[test]
    fn test_set_membership_clause_splits_on_commas() {
        let filter = SearchFilter::from_params(&params(&[("animalType", "Mammal,Bird")]));
        let (cond, binds) = filter.condition();

        assert!(cond.contains("animal_type IN (?, ?)"));
        assert_eq!(binds, vec!["Mammal".to_string(), "Bird".to_string()]);
    }

    #[test]
    fn test_data_types_uses_json_membership() {
        let filter = SearchFilter::from_params(&params(&[("dataTypes", "GPS, Accelerometer")]));
        let (cond, binds) = filter.condition();

        assert!(cond.contains("json_each(posts.data_types)"));
        assert_eq!(binds, vec!["GPS".to_string(), "Accelerometer".to_string()]);
    }

    #[test]
    fn test_clauses_are_and_composed() {
        let filter =
            SearchFilter::from_params(&params(&[("title", "fox"), ("animalType", "Mammal")]));
        let (cond, binds) = filter.condition();

        assert!(cond.contains(" AND "));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        let filter = SearchFilter::from_params(&params(&[("title", "100%_done")]));
        let (_, binds) = filter.condition();

        assert_eq!(binds, vec!["100\\%\\_done".to_string()]);
    }

    #[test]
    fn test_empty_value_imposes_no_constraint() {
        let filter = SearchFilter::from_params(&params(&[("title", "")]));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_all_blank_alternatives_impose_no_constraint() {
        let filter = SearchFilter::from_params(&params(&[("animalType", " , ,")]));
        assert!(filter.is_empty());
    }
}
