//! Well-known namespace and collation URIs.

/// Namespace of the built-in function library (`fn:`).
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
/// XML Schema namespace (`xs:`).
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace URI used for W3C-defined XPath/XQuery error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// Reserved `xml` prefix binding.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

pub const CODEPOINT_URI: &str = "http://www.w3.org/2005/xpath-functions/collation/codepoint";
pub const SIMPLE_CASE_URI: &str = "urn:xquery-flwor:collation:simple-case";
pub const SIMPLE_ACCENT_URI: &str = "urn:xquery-flwor:collation:simple-accent";
pub const SIMPLE_CASE_ACCENT_URI: &str = "urn:xquery-flwor:collation:simple-case-accent";
