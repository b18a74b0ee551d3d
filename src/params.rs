//! Attaching named, typed parameters to a driver request.

use crate::driver::Request;
use crate::query::{ParamValues, Parameter};
use crate::types::SqlValue;

/// Attach every parameter to the request, inferring a wire type where none
/// was given explicitly.
///
/// Array values reaching this stage are a contract violation (the rewriter
/// expands them first); they are skipped rather than failing, to tolerate
/// partial inputs. Positional values are likewise not expected here, but are
/// bound under synthesized `p<index>` names when they show up.
pub fn bind_parameters(request: &mut Request, values: &ParamValues) {
    match values {
        ParamValues::Named(entries) => {
            for (name, parameter) in entries {
                bind_one(request, name, parameter);
            }
        }
        ParamValues::Positional(entries) => {
            for (idx, parameter) in entries.iter().enumerate() {
                bind_one(request, &format!("p{idx}"), parameter);
            }
        }
    }
}

fn bind_one(request: &mut Request, name: &str, parameter: &Parameter) {
    if matches!(parameter.value(), SqlValue::Array(_)) {
        tracing::warn!(name, "skipping unexpanded array parameter");
        return;
    }
    request.add_parameter(name, parameter.wire_type(), parameter.value().clone());
}
