//! Flakes: atomic facts
//!
//! A flake is `(subject, predicate, object, datatype, t, op, meta)`.
//! Flakes are immutable once committed. The [`Spot`] of a flake,
//! `(subject, predicate, datatype)`, is the coordinate used for conflict
//! detection; it deliberately ignores the value and `t`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace-encoded IRI: a namespace code plus the local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid {
    /// Namespace code, resolved through [`crate::namespace::NamespaceCodes`]
    pub ns_code: u16,
    /// Local name within the namespace
    pub name: String,
}

impl Sid {
    /// Create a new Sid
    pub fn new(ns_code: u16, name: impl Into<String>) -> Self {
        Sid {
            ns_code,
            name: name.into(),
        }
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ns_code, self.name)
    }
}

/// Well-known datatype Sids
pub mod datatype {
    use super::Sid;
    use crate::namespace::XSD;

    /// xsd:string
    pub fn string() -> Sid {
        Sid::new(XSD, "string")
    }

    /// xsd:long
    pub fn long() -> Sid {
        Sid::new(XSD, "long")
    }

    /// xsd:boolean
    pub fn boolean() -> Sid {
        Sid::new(XSD, "boolean")
    }

    /// Reference to another subject
    pub fn id() -> Sid {
        Sid::new(crate::namespace::JSON_LD, "id")
    }
}

/// Object value of a flake
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlakeValue {
    /// Reference to another subject
    Ref(Sid),
    /// String literal
    String(String),
    /// Integer literal
    Long(i64),
    /// Boolean literal
    Boolean(bool),
}

impl fmt::Display for FlakeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlakeValue::Ref(sid) => write!(f, "<{}>", sid),
            FlakeValue::String(s) => write!(f, "{:?}", s),
            FlakeValue::Long(n) => write!(f, "{}", n),
            FlakeValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FlakeValue {
    fn from(s: &str) -> Self {
        FlakeValue::String(s.to_string())
    }
}

impl From<i64> for FlakeValue {
    fn from(n: i64) -> Self {
        FlakeValue::Long(n)
    }
}

impl From<bool> for FlakeValue {
    fn from(b: bool) -> Self {
        FlakeValue::Boolean(b)
    }
}

/// Optional per-flake metadata (language tag, list index)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FlakeMeta {
    /// Language tag for rdf:langString values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Position within an ordered list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i: Option<i64>,
}

/// An atomic fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Flake {
    /// Subject
    pub s: Sid,
    /// Predicate
    pub p: Sid,
    /// Object value
    pub o: FlakeValue,
    /// Datatype
    pub dt: Sid,
    /// Transaction counter
    pub t: i64,
    /// true = assertion, false = retraction
    pub op: bool,
    /// Optional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<FlakeMeta>,
}

impl Flake {
    /// Create a new flake without metadata
    pub fn new(s: Sid, p: Sid, o: FlakeValue, dt: Sid, t: i64, op: bool) -> Self {
        Flake {
            s,
            p,
            o,
            dt,
            t,
            op,
            m: None,
        }
    }

    /// Attach metadata
    pub fn with_meta(mut self, m: FlakeMeta) -> Self {
        self.m = Some(m);
        self
    }

    /// Conflict-detection coordinate of this flake
    pub fn spot(&self) -> Spot {
        Spot {
            s: self.s.clone(),
            p: self.p.clone(),
            dt: self.dt.clone(),
        }
    }

    /// Same fact at a different `t`
    pub fn retimed(&self, t: i64) -> Flake {
        Flake { t, ..self.clone() }
    }

    /// Same fact with the assertion flag set to `op`
    pub fn with_op(&self, op: bool) -> Flake {
        Flake { op, ..self.clone() }
    }

    /// True if both flakes state the same fact, ignoring `t` and `op`
    pub fn same_fact(&self, other: &Flake) -> bool {
        self.s == other.s
            && self.p == other.p
            && self.o == other.o
            && self.dt == other.dt
            && self.m == other.m
    }

    /// Identity of the fact independent of `t`/`op`
    pub fn fact_key(&self) -> FactValue {
        FactValue {
            o: self.o.clone(),
            m: self.m.clone(),
        }
    }
}

impl fmt::Display for Flake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {} t={} {}]",
            self.s,
            self.p,
            self.o,
            self.dt,
            self.t,
            if self.op { "+" } else { "-" }
        )
    }
}

/// Value half of a fact: object plus metadata.
///
/// Two flakes at the same [`Spot`] hold the same value iff their
/// `FactValue`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactValue {
    /// Object value
    pub o: FlakeValue,
    /// Optional metadata
    pub m: Option<FlakeMeta>,
}

impl FactValue {
    /// Rebuild a flake at `spot` carrying this value
    pub fn to_flake(&self, spot: &Spot, t: i64, op: bool) -> Flake {
        Flake {
            s: spot.s.clone(),
            p: spot.p.clone(),
            o: self.o.clone(),
            dt: spot.dt.clone(),
            t,
            op,
            m: self.m.clone(),
        }
    }
}

/// `(subject, predicate, datatype)` coordinate of a flake
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Spot {
    /// Subject
    pub s: Sid,
    /// Predicate
    pub p: Sid,
    /// Datatype
    pub dt: Sid,
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.s, self.p, self.dt)
    }
}
