use crate::ast::EmptyOrder;
use crate::consts::{CODEPOINT_URI, FNS, XML_URI};
use crate::engine::collation::{Collation, CollationRegistry};
use crate::model::XdmNode;
use crate::xdm::{ExpandedName, XdmItem, XdmSequence};
use chrono::{FixedOffset, Offset, Utc};
use core::fmt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub use crate::consts::ERR_NS;

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// No function with the (possibly default-namespace resolved) name exists.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Provides known arities.
    WrongArity {
        name: ExpandedName,
        available: Vec<Arity>,
    },
}

impl ResolveError {
    pub fn into_error(self) -> Error {
        match self {
            ResolveError::Unknown(name) => {
                Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}"))
            }
            ResolveError::WrongArity { name, available } => Error::from_code(
                ErrorCode::XPST0017,
                format!("function {name} has no overload of this arity (available: {available:?})"),
            ),
        }
    }
}

pub struct CallCtx<'a, N> {
    pub dyn_ctx: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
    pub default_collation: Arc<dyn Collation>,
    pub implicit_timezone: FixedOffset,
}

pub type FunctionImpl<N> =
    Arc<dyn Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync>;

pub type FunctionOverload<N> = (Arity, Option<Arity>, FunctionImpl<N>);

pub struct FunctionRegistry<N> {
    // Each name maps to (min_arity, max_arity, impl) entries; `None` max means variadic.
    fns: HashMap<ExpandedName, Vec<FunctionOverload<N>>>,
}

impl<N> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

impl<N> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function by name with an arity range. Overlapping ranges are
    /// allowed; resolution prefers the highest minimum, then the smallest maximum.
    pub fn register_range(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        func: FunctionImpl<N>,
    ) {
        let entries = self.fns.entry(name).or_default();
        entries.push((min_arity, max_arity, func));
        entries.sort_by(|a, b| {
            b.0.cmp(&a.0).then_with(|| match (&a.1, &b.1) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => core::cmp::Ordering::Less,
                (None, Some(_)) => core::cmp::Ordering::Greater,
                (None, None) => core::cmp::Ordering::Equal,
            })
        });
    }

    pub fn register(&mut self, name: ExpandedName, arity: Arity, func: FunctionImpl<N>) {
        self.register_range(name, arity, Some(arity), func);
    }

    /// Register a plain closure in a namespace.
    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, arity: Arity, f: F)
    where
        F: 'static
            + Send
            + Sync
            + Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>,
    {
        self.register(
            ExpandedName::new(Some(ns_uri.to_string()), local),
            arity,
            Arc::new(f),
        );
    }

    pub fn register_ns_range<F>(
        &mut self,
        ns_uri: &str,
        local: &str,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static
            + Send
            + Sync
            + Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error>,
    {
        self.register_range(
            ExpandedName::new(Some(ns_uri.to_string()), local),
            min_arity,
            max_arity,
            Arc::new(f),
        );
    }

    pub fn contains(&self, name: &ExpandedName, arity: Arity) -> bool {
        self.resolve(name, arity).is_ok()
    }

    /// Resolve a function by (already namespace-resolved) name and arity.
    pub fn resolve(&self, name: &ExpandedName, arity: Arity) -> Result<&FunctionImpl<N>, ResolveError> {
        let Some(cands) = self.fns.get(name) else {
            return Err(ResolveError::Unknown(name.clone()));
        };
        if let Some((_, _, f)) = cands
            .iter()
            .find(|(min, max, _)| arity >= *min && max.is_none_or(|m| arity <= m))
        {
            return Ok(f);
        }
        let mut available: Vec<Arity> = cands
            .iter()
            .filter_map(|(min, max, _)| max.map(|m| *min..=m))
            .flatten()
            .collect();
        available.sort_unstable();
        available.dedup();
        Err(ResolveError::WrongArity {
            name: name.clone(),
            available,
        })
    }
}

/// Error codes emitted by the compiler and the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOAR0001, // division by zero
    FOAR0002, // numeric overflow
    FOCH0002, // unknown collation
    FOER0000, // fn:error default / unspecified
    FORG0001, // invalid value for cast
    FORG0004, // zero-or-one violated
    FORG0005, // exactly-one violated
    FORG0006, // invalid argument type (EBV)
    FOTY0013, // atomization of a function item
    XPDY0002, // context item or external variable absent
    XPST0003, // malformed expression
    XPST0008, // undeclared variable
    XPST0017, // unknown function or arity
    XPST0051, // unknown atomic type
    XPST0081, // unknown namespace prefix
    XPTY0004, // type error
    XQDY0054, // circular initialization
    XQST0089, // positional variable equals bound variable
    XQST0094, // grouping variable not in scope
    XQST0103, // duplicate window variable
    Unknown,
}

const ALL_CODES: [ErrorCode; 20] = [
    ErrorCode::FOAR0001,
    ErrorCode::FOAR0002,
    ErrorCode::FOCH0002,
    ErrorCode::FOER0000,
    ErrorCode::FORG0001,
    ErrorCode::FORG0004,
    ErrorCode::FORG0005,
    ErrorCode::FORG0006,
    ErrorCode::FOTY0013,
    ErrorCode::XPDY0002,
    ErrorCode::XPST0003,
    ErrorCode::XPST0008,
    ErrorCode::XPST0017,
    ErrorCode::XPST0051,
    ErrorCode::XPST0081,
    ErrorCode::XPTY0004,
    ErrorCode::XQDY0054,
    ErrorCode::XQST0089,
    ErrorCode::XQST0094,
    ErrorCode::XQST0103,
];

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FOAR0001 => "FOAR0001",
            ErrorCode::FOAR0002 => "FOAR0002",
            ErrorCode::FOCH0002 => "FOCH0002",
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::FORG0001 => "FORG0001",
            ErrorCode::FORG0004 => "FORG0004",
            ErrorCode::FORG0005 => "FORG0005",
            ErrorCode::FORG0006 => "FORG0006",
            ErrorCode::FOTY0013 => "FOTY0013",
            ErrorCode::XPDY0002 => "XPDY0002",
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0008 => "XPST0008",
            ErrorCode::XPST0017 => "XPST0017",
            ErrorCode::XPST0051 => "XPST0051",
            ErrorCode::XPST0081 => "XPST0081",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::XQDY0054 => "XQDY0054",
            ErrorCode::XQST0089 => "XQST0089",
            ErrorCode::XQST0094 => "XQST0094",
            ErrorCode::XQST0103 => "XQST0103",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// QName of this code in the `http://www.w3.org/2005/xqt-errors` namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.as_str())
    }

    /// Parses `err:LOCAL` into a known code.
    pub fn from_code(s: &str) -> Self {
        s.strip_prefix("err:")
            .and_then(|local| ALL_CODES.iter().find(|c| c.as_str() == local))
            .copied()
            .unwrap_or(ErrorCode::Unknown)
    }

    /// Static errors are raised by the compiler before any data is touched.
    pub fn is_static(&self) -> bool {
        let s = self.as_str();
        s.starts_with("XPST") || s.starts_with("XQST")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            source: None,
        }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new_qname(code.qname(), msg)
    }

    pub fn code_enum(&self) -> ErrorCode {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&format!("err:{}", self.code.local))
        } else {
            ErrorCode::Unknown
        }
    }

    pub fn is_static(&self) -> bool {
        self.code_enum().is_static()
    }

    /// Human-readable code: `err:LOCAL` or `Q{ns}local`.
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else {
            self.code.to_string()
        }
    }

    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StaticContext {
    pub default_function_namespace: Option<String>,
    pub default_collation: Option<String>,
    pub default_empty_order: EmptyOrder,
    pub namespaces: NamespaceBindings,
    /// External variables visible without a prolog declaration.
    pub in_scope_variables: HashSet<ExpandedName>,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        ns.by_prefix.insert("xml".to_string(), XML_URI.to_string());
        ns.by_prefix.insert("fn".to_string(), FNS.to_string());
        ns.by_prefix
            .insert("xs".to_string(), crate::consts::XS.to_string());
        ns.by_prefix
            .insert("err".to_string(), ERR_NS.to_string());
        Self {
            default_function_namespace: Some(FNS.to_string()),
            default_collation: Some(CODEPOINT_URI.to_string()),
            default_empty_order: EmptyOrder::Least,
            namespaces: ns,
            in_scope_variables: HashSet::new(),
        }
    }
}

/// Builder for [`StaticContext`]. The result is captured by `compile`; a
/// different static context at evaluation time has no effect.
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    pub fn with_default_function_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_function_namespace = Some(uri.into());
        self
    }

    pub fn with_default_collation(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_collation = Some(uri.into());
        self
    }

    pub fn with_default_empty_order(mut self, order: EmptyOrder) -> Self {
        self.ctx.default_empty_order = order;
        self
    }

    /// Register a prefix → URI mapping. The reserved `xml` prefix cannot be rebound.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn with_variable(mut self, name: ExpandedName) -> Self {
        self.ctx.in_scope_variables.insert(name);
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

#[derive(Clone)]
pub struct DynamicContext<N> {
    pub context_item: Option<XdmItem<N>>,
    pub variables: HashMap<ExpandedName, XdmSequence<N>>,
    pub default_collation: Option<String>,
    pub functions: Arc<FunctionRegistry<N>>,
    pub collations: Arc<CollationRegistry>,
    pub timezone_override: Option<FixedOffset>,
}

impl<N: XdmNode> Default for DynamicContext<N> {
    fn default() -> Self {
        Self {
            context_item: None,
            variables: HashMap::new(),
            default_collation: None,
            functions: Arc::new(crate::engine::functions::default_function_registry::<N>()),
            collations: Arc::new(CollationRegistry::default()),
            timezone_override: None,
        }
    }
}

impl<N> DynamicContext<N> {
    /// Implicit timezone for date/time values without one; UTC unless overridden.
    pub fn implicit_timezone(&self) -> FixedOffset {
        self.timezone_override.unwrap_or_else(|| Utc.fix())
    }
}

pub struct DynamicContextBuilder<N> {
    ctx: DynamicContext<N>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext::default(),
        }
    }

    pub fn with_context_item(mut self, item: impl Into<XdmItem<N>>) -> Self {
        self.ctx.context_item = Some(item.into());
        self
    }

    pub fn with_variable(mut self, name: ExpandedName, value: impl Into<XdmSequence<N>>) -> Self {
        self.ctx.variables.insert(name, value.into());
        self
    }

    /// Overrides the default collation captured in the static context.
    pub fn with_default_collation(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_collation = Some(uri.into());
        self
    }

    pub fn with_functions(mut self, reg: Arc<FunctionRegistry<N>>) -> Self {
        self.ctx.functions = reg;
        self
    }

    pub fn with_collations(mut self, reg: Arc<CollationRegistry>) -> Self {
        self.ctx.collations = reg;
        self
    }

    pub fn with_timezone(mut self, offset_minutes: i32) -> Self {
        if let Some(tz) = FixedOffset::east_opt(offset_minutes * 60) {
            self.ctx.timezone_override = Some(tz);
        }
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("err:XPTY0004", ErrorCode::XPTY0004)]
    #[case("err:XQST0094", ErrorCode::XQST0094)]
    #[case("err:NOPE0000", ErrorCode::Unknown)]
    #[case("XPTY0004", ErrorCode::Unknown)]
    fn codes_parse_from_prefixed_form(#[case] s: &str, #[case] expected: ErrorCode) {
        assert_eq!(ErrorCode::from_code(s), expected);
    }

    #[rstest]
    fn static_codes_are_flagged() {
        assert!(Error::from_code(ErrorCode::XPST0008, "x").is_static());
        assert!(Error::from_code(ErrorCode::XQST0103, "x").is_static());
        assert!(!Error::from_code(ErrorCode::XPTY0004, "x").is_static());
    }

    #[rstest]
    fn resolve_reports_available_arities() {
        let mut reg: FunctionRegistry<crate::model::simple::SimpleNode> = FunctionRegistry::new();
        reg.register_ns_range("urn:t", "f", 1, Some(2), |_c, _a| Ok(vec![]));
        let name = ExpandedName::new(Some("urn:t".into()), "f");
        assert!(reg.contains(&name, 2));
        match reg.resolve(&name, 3) {
            Err(ResolveError::WrongArity { available, .. }) => assert_eq!(available, vec![1, 2]),
            _ => panic!("expected wrong arity"),
        }
        let missing = ExpandedName::new(Some("urn:t".into()), "g");
        assert!(matches!(reg.resolve(&missing, 0), Err(ResolveError::Unknown(_))));
    }
}
