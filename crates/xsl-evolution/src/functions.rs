//! Built-in function classification
//!
//! Built-ins fall into three groups for symbolic evaluation: `current()`,
//! which re-reports its context, argument-transparent functions, whose
//! arguments are evaluated for their accesses while the call itself does not
//! navigate, and functions that reach outside the schema (other documents,
//! keys, ids), which are not supported.

use xsl_ir::QName;

const XPATH_FUNCTIONS_NS: &str = "http://www.w3.org/2005/xpath-functions";
const XSLT_NS: &str = "http://www.w3.org/1999/XSL/Transform";

const TRANSPARENT: &[&str] = &[
    // strings
    "string",
    "concat",
    "contains",
    "starts-with",
    "ends-with",
    "substring",
    "substring-before",
    "substring-after",
    "string-length",
    "normalize-space",
    "translate",
    "upper-case",
    "lower-case",
    "string-join",
    "replace",
    "matches",
    "tokenize",
    "format-number",
    // numbers and aggregates
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "number",
    "round",
    "floor",
    "ceiling",
    "abs",
    // booleans and sequences
    "boolean",
    "not",
    "true",
    "false",
    "empty",
    "exists",
    "position",
    "last",
    "data",
    "distinct-values",
    "reverse",
    "subsequence",
    // node identity
    "name",
    "local-name",
    "namespace-uri",
    "generate-id",
    "lang",
];

const UNSUPPORTED: &[&str] = &["document", "id", "key", "unparsed-entity-uri"];

/// How a built-in function call is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    /// `current()`
    Current,
    /// Arguments are evaluated against the context, the call returns it
    Transparent,
    /// Reaches outside the schema; not supported
    Unsupported,
    /// Not a built-in this interpreter knows
    Unknown,
}

/// Classify a function by its qualified name
pub fn classify_function(name: &QName) -> FunctionClass {
    let builtin = match name.namespace.as_deref() {
        None => true,
        Some(ns) => ns == XPATH_FUNCTIONS_NS || ns == XSLT_NS,
    };
    if !builtin {
        return FunctionClass::Unknown;
    }

    let local = name.local_name();
    if local == "current" {
        FunctionClass::Current
    } else if TRANSPARENT.contains(&local) {
        FunctionClass::Transparent
    } else if UNSUPPORTED.contains(&local) {
        FunctionClass::Unsupported
    } else {
        FunctionClass::Unknown
    }
}
