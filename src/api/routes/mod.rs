//! Endpoint handlers, grouped the way they appear in the listing

pub mod database;
pub mod monitoring;
pub mod network;
pub mod status;
pub mod system;
pub mod wireless;

use super::error::{ApiError, ApiResult};
use super::request::ApiRequest;
use super::router::{RouteError, RouteTable};
use super::state::ApiState;

/// Register every endpoint, in listing order
pub fn register_endpoints(table: &mut RouteTable<ApiState>) -> Result<(), RouteError> {
    status::register(table)?;
    system::register(table)?;
    network::register(table)?;
    wireless::register(table)?;
    monitoring::register(table)?;
    database::register(table)?;
    Ok(())
}

/// Integer query parameter with a default and an inclusive range
///
/// Absent or empty uses `default`; values outside the range are clamped.
/// Anything that is not an integer is a bad request.
pub(crate) fn bounded_param(
    request: &ApiRequest,
    key: &str,
    default: u32,
    min: u32,
    max: u32,
) -> ApiResult<u32> {
    let Some(value) = request.query_param::<i64>(key)? else {
        return Ok(default);
    };
    Ok(value.clamp(i64::from(min), i64::from(max)) as u32)
}

/// Path segment parsed as an integer, 400 when it is not one
pub(crate) fn numeric_segment(request: &ApiRequest, index: usize) -> ApiResult<i64> {
    let raw = request.segment(index).unwrap_or_default();
    raw.parse().map_err(|_| {
        ApiError::InvalidRequest(format!("expected a number in the path, got '{raw}'"))
    })
}

/// Non-empty output lines of a shell command
pub(crate) fn output_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
