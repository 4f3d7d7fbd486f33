//! Operation tokens accepted on the command line

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::TesterError;

/// One block of the smoke test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Insert,
    Query,
    Drop,
}

impl FromStr for Operation {
    type Err = TesterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Operation::Insert),
            "query" => Ok(Operation::Query),
            "drop" => Ok(Operation::Drop),
            _ => Err(TesterError::UnknownOperation(s.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Insert => "insert",
            Operation::Query => "query",
            Operation::Drop => "drop",
        })
    }
}

/// Requested operations; order and repetition on the command line do not matter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSet(BTreeSet<Operation>);

impl OperationSet {
    pub fn contains(&self, op: Operation) -> bool {
        self.0.contains(&op)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Operation> for OperationSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for OperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("insert".parse::<Operation>().unwrap(), Operation::Insert);
        assert_eq!("QUERY".parse::<Operation>().unwrap(), Operation::Query);
        assert_eq!("Drop".parse::<Operation>().unwrap(), Operation::Drop);
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = "update".parse::<Operation>().unwrap_err();
        assert!(matches!(err, TesterError::UnknownOperation(ref token) if token == "update"));
    }

    #[test]
    fn test_set_ignores_order_and_repetition() {
        let set: OperationSet = [Operation::Drop, Operation::Insert, Operation::Drop]
            .into_iter()
            .collect();
        assert!(set.contains(Operation::Insert));
        assert!(set.contains(Operation::Drop));
        assert!(!set.contains(Operation::Query));
        assert_eq!(set.to_string(), "[insert, drop]");
    }
}
