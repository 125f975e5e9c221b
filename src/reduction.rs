//! The terminal value of a reduction pass.

use std::collections::BTreeMap;
use std::fmt;

use crate::reducer::EntryReceiver;

/// Per-field numeric results, ordered by field name.
pub type FieldValues = BTreeMap<String, f64>;

/// Result emitted by a reducer, exactly once per pass.
#[derive(Debug)]
pub enum Reduction {
    /// The untouched input stream, handed back by `ReadAll`. The receiver of
    /// this value must drain it.
    Forwarded(EntryReceiver),
    /// Number of entries observed.
    Count(u64),
    /// Sum per configured field.
    FieldSums(FieldValues),
    /// Mean per configured field.
    FieldAverages(FieldValues),
    /// One result per chained reducer, in chain order.
    Chain(Vec<Reduction>),
    /// Placeholder for a chained reducer that ended without emitting, named
    /// after that reducer.
    Missing(String),
}

impl Reduction {
    /// Short name of the variant. Apart from `MISSING` this is the name of
    /// the reducer that produces it.
    pub fn kind(&self) -> &'static str {
        match self {
            Reduction::Forwarded(_) => "READALL",
            Reduction::Count(_) => "COUNT",
            Reduction::FieldSums(_) => "SUM",
            Reduction::FieldAverages(_) => "AVG",
            Reduction::Chain(_) => "CHAIN",
            Reduction::Missing(_) => "MISSING",
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Reduction::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn field_sums(&self) -> Option<&FieldValues> {
        match self {
            Reduction::FieldSums(sums) => Some(sums),
            _ => None,
        }
    }

    pub fn field_averages(&self) -> Option<&FieldValues> {
        match self {
            Reduction::FieldAverages(avgs) => Some(avgs),
            _ => None,
        }
    }

    pub fn into_forwarded(self) -> Option<EntryReceiver> {
        match self {
            Reduction::Forwarded(rx) => Some(rx),
            _ => None,
        }
    }

    pub fn into_chain(self) -> Option<Vec<Reduction>> {
        match self {
            Reduction::Chain(results) => Some(results),
            _ => None,
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, values: &FieldValues) -> fmt::Result {
    for (name, value) in values {
        write!(f, " {name}={value}")?;
    }
    Ok(())
}

/// Summary line in the `NAME=value` style, e.g. `COUNT=3` or
/// `SUM bytes=512 time=0.5`.
impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Forwarded(_) => write!(f, "READALL (stream)"),
            Reduction::Count(n) => write!(f, "COUNT={n}"),
            Reduction::FieldSums(values) | Reduction::FieldAverages(values) => {
                write!(f, "{}", self.kind())?;
                write_fields(f, values)
            }
            Reduction::Missing(name) => write!(f, "{name} (no result)"),
            Reduction::Chain(results) => {
                let parts: Vec<String> = results.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> FieldValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_accessors_match_variant() {
        let count = Reduction::Count(7);
        assert_eq!(count.kind(), "COUNT");
        assert_eq!(count.as_count(), Some(7));
        assert!(count.field_sums().is_none());

        let sums = Reduction::FieldSums(values(&[("a", 1.0)]));
        assert_eq!(sums.field_sums(), Some(&values(&[("a", 1.0)])));
        assert!(sums.field_averages().is_none());
        assert!(sums.as_count().is_none());
        assert!(sums.into_forwarded().is_none());
    }

    #[test]
    fn test_into_chain() {
        let chain = Reduction::Chain(vec![Reduction::Count(1), Reduction::Count(2)]);
        let results = chain.into_chain().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].as_count(), Some(2));
        assert!(Reduction::Count(0).into_chain().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Reduction::Count(3).to_string(), "COUNT=3");
        assert_eq!(
            Reduction::FieldSums(values(&[("b", 2.0), ("a", 4.5)])).to_string(),
            "SUM a=4.5 b=2"
        );
        assert_eq!(
            Reduction::Chain(vec![
                Reduction::Count(2),
                Reduction::FieldAverages(values(&[("t", 0.5)])),
            ])
            .to_string(),
            "COUNT=2 | AVG t=0.5"
        );
    }

    #[test]
    fn test_display_missing_in_chain() {
        let chain = Reduction::Chain(vec![
            Reduction::Missing("SUM".to_string()),
            Reduction::Count(1),
        ]);
        assert_eq!(chain.to_string(), "SUM (no result) | COUNT=1");
    }

    #[test]
    fn test_display_forwarded() {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        assert_eq!(Reduction::Forwarded(rx).to_string(), "READALL (stream)");
    }
}
