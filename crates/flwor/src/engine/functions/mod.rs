//! Built-in function library.
//!
//! Registration conventions:
//! - One registration per function name, using `register_ns_range` when the
//!   function has optional parameters; the implementation dispatches on
//!   `args.len()`.
//! - `fn:concat` is the only variadic function (`max_arity = None`).
//! - `fn:exists`, `fn:empty` and `fn:head` are also evaluated lazily by the
//!   evaluator; the entries here serve dynamic calls and function references.

use crate::consts::{FNS, XS};
use crate::engine::runtime::FunctionRegistry;
use crate::model::XdmNode;

mod aggregates;
mod boolean;
mod common;
mod constructors;
mod diagnostics;
mod numeric;
mod sequences;
mod strings;

pub fn default_function_registry<N: XdmNode>() -> FunctionRegistry<N> {
    let mut reg = FunctionRegistry::new();

    // boolean
    reg.register_ns(FNS, "true", 0, boolean::fn_true::<N>);
    reg.register_ns(FNS, "false", 0, boolean::fn_false::<N>);
    reg.register_ns(FNS, "not", 1, boolean::fn_not::<N>);
    reg.register_ns(FNS, "boolean", 1, boolean::fn_boolean::<N>);

    // sequences
    reg.register_ns(FNS, "empty", 1, sequences::empty_fn::<N>);
    reg.register_ns(FNS, "exists", 1, sequences::exists_fn::<N>);
    reg.register_ns(FNS, "head", 1, sequences::head_fn::<N>);
    reg.register_ns(FNS, "tail", 1, sequences::tail_fn::<N>);
    reg.register_ns(FNS, "count", 1, sequences::count_fn::<N>);
    reg.register_ns(FNS, "reverse", 1, sequences::reverse_fn::<N>);
    reg.register_ns(FNS, "data", 1, sequences::data_fn::<N>);
    reg.register_ns_range(FNS, "subsequence", 2, Some(3), sequences::subsequence_fn::<N>);
    reg.register_ns_range(FNS, "distinct-values", 1, Some(2), sequences::distinct_values_fn::<N>);
    reg.register_ns_range(FNS, "index-of", 2, Some(3), sequences::index_of_fn::<N>);
    reg.register_ns(FNS, "insert-before", 3, sequences::insert_before_fn::<N>);
    reg.register_ns(FNS, "remove", 2, sequences::remove_fn::<N>);
    reg.register_ns(FNS, "zero-or-one", 1, sequences::zero_or_one_fn::<N>);
    reg.register_ns(FNS, "one-or-more", 1, sequences::one_or_more_fn::<N>);
    reg.register_ns(FNS, "exactly-one", 1, sequences::exactly_one_fn::<N>);

    // aggregates
    reg.register_ns_range(FNS, "sum", 1, Some(2), aggregates::sum_fn::<N>);
    reg.register_ns(FNS, "avg", 1, aggregates::avg_fn::<N>);
    reg.register_ns_range(FNS, "min", 1, Some(2), aggregates::min_fn::<N>);
    reg.register_ns_range(FNS, "max", 1, Some(2), aggregates::max_fn::<N>);

    // strings
    reg.register_ns(FNS, "string", 1, strings::string_fn::<N>);
    reg.register_ns_range(FNS, "concat", 2, None, strings::concat_fn::<N>);
    reg.register_ns_range(FNS, "string-join", 1, Some(2), strings::string_join_fn::<N>);
    reg.register_ns(FNS, "string-length", 1, strings::string_length_fn::<N>);
    reg.register_ns(FNS, "upper-case", 1, strings::upper_case_fn::<N>);
    reg.register_ns(FNS, "lower-case", 1, strings::lower_case_fn::<N>);
    reg.register_ns(FNS, "normalize-space", 1, strings::normalize_space_fn::<N>);
    reg.register_ns_range(FNS, "normalize-unicode", 1, Some(2), strings::normalize_unicode_fn::<N>);
    reg.register_ns_range(FNS, "contains", 2, Some(3), strings::contains_fn::<N>);
    reg.register_ns_range(FNS, "starts-with", 2, Some(3), strings::starts_with_fn::<N>);
    reg.register_ns_range(FNS, "ends-with", 2, Some(3), strings::ends_with_fn::<N>);
    reg.register_ns_range(FNS, "substring", 2, Some(3), strings::substring_fn::<N>);
    reg.register_ns_range(FNS, "compare", 2, Some(3), strings::compare_fn::<N>);

    // numeric
    reg.register_ns(FNS, "abs", 1, numeric::abs_fn::<N>);
    reg.register_ns(FNS, "floor", 1, numeric::floor_fn::<N>);
    reg.register_ns(FNS, "ceiling", 1, numeric::ceiling_fn::<N>);
    reg.register_ns(FNS, "round", 1, numeric::round_fn::<N>);
    reg.register_ns(FNS, "number", 1, numeric::number_fn::<N>);

    // diagnostics
    reg.register_ns_range(FNS, "error", 0, Some(3), diagnostics::error_fn::<N>);
    reg.register_ns_range(FNS, "trace", 1, Some(2), diagnostics::trace_fn::<N>);

    // constructors
    reg.register_ns(FNS, "QName", 2, constructors::qname_fn::<N>);
    for ty in constructors::CONSTRUCTIBLE {
        reg.register_ns(XS, constructors::local_name(ty), 1, move |ctx, args| {
            constructors::construct(ctx, args, ty)
        });
    }

    reg
}
