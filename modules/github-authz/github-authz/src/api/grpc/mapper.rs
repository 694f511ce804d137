//! Conversions between `ext_authz` protocol messages and domain types.

use github_authz_sdk::proto::envoy::config::core::v3::{
    HeaderValue, HeaderValueOption, header_value_option::HeaderAppendAction,
};
use github_authz_sdk::proto::envoy::r#type::v3::{HttpStatus, StatusCode};
use github_authz_sdk::proto::envoy::service::auth::v3::{
    CheckRequest, CheckResponse, DeniedHttpResponse, OkHttpResponse, attribute_context::HttpRequest,
    check_response::HttpResponse,
};
use github_authz_sdk::proto::google::rpc;

use crate::domain::credential::find_authorization;
use crate::domain::{CheckInput, DenyCode, ResolvedIdentity, Verdict};

pub const HEADER_USER: &str = "x-github-user";
pub const HEADER_USER_ID: &str = "x-github-user-id";
pub const HEADER_ORGS: &str = "x-github-orgs";
pub const HEADER_AUTH_METHOD: &str = "x-auth-method";
pub const AUTH_METHOD: &str = "github-oauth";

fn http_request(req: &CheckRequest) -> Option<&HttpRequest> {
    req.attributes.as_ref()?.request.as_ref()?.http.as_ref()
}

/// Borrow the fields the service needs from a check request.
///
/// The `authorization` header is looked up in `headers` first, then in
/// `header_map` (where the proxy may send raw byte values).
#[must_use]
pub fn check_input(req: &CheckRequest) -> CheckInput<'_> {
    let Some(http) = http_request(req) else {
        return CheckInput::default();
    };

    let authorization = find_authorization(
        http.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    )
    .or_else(|| {
        let map = http.header_map.as_ref()?;
        find_authorization(map.headers.iter().filter_map(|h| {
            let value = if h.value.is_empty() {
                std::str::from_utf8(&h.raw_value).ok()?
            } else {
                h.value.as_str()
            };
            Some((h.key.as_str(), value))
        }))
    });

    CheckInput {
        method: &http.method,
        path: &http.path,
        authorization,
        deadline: None,
    }
}

/// Header that replaces any value the downstream request already carries.
fn overwrite(key: &str, value: impl Into<String>) -> HeaderValueOption {
    HeaderValueOption {
        header: Some(HeaderValue {
            key: key.to_owned(),
            value: value.into(),
            raw_value: Vec::new(),
        }),
        append_action: HeaderAppendAction::OverwriteIfExistsOrAdd as i32,
        keep_empty_value: true,
    }
}

/// Render a verdict as a `CheckResponse`.
#[must_use]
pub fn check_response(verdict: &Verdict) -> CheckResponse {
    match verdict {
        Verdict::Allow { resolved, .. } => allow_response(resolved),
        Verdict::Deny { code, message } => deny_response(*code, message),
    }
}

/// OK response injecting the identity headers into the upstream request.
#[must_use]
pub fn allow_response(resolved: &ResolvedIdentity) -> CheckResponse {
    let headers = vec![
        overwrite(HEADER_USER, resolved.identity.login.as_str()),
        overwrite(HEADER_USER_ID, resolved.identity.id.to_string()),
        overwrite(HEADER_ORGS, resolved.memberships.joined()),
        overwrite(HEADER_AUTH_METHOD, AUTH_METHOD),
    ];

    CheckResponse {
        status: Some(rpc::Status {
            code: tonic::Code::Ok as i32,
            message: String::new(),
        }),
        http_response: Some(HttpResponse::OkResponse(OkHttpResponse {
            headers,
            ..OkHttpResponse::default()
        })),
    }
}

/// Denied response with a JSON body `{"error": <code>, "message": <reason>}`.
#[must_use]
pub fn deny_response(code: DenyCode, message: &str) -> CheckResponse {
    let http_status = match code {
        DenyCode::Unauthenticated => StatusCode::Unauthorized,
        DenyCode::PermissionDenied => StatusCode::Forbidden,
    };
    let body = serde_json::json!({
        "error": code.as_str(),
        "message": message,
    });

    CheckResponse {
        status: Some(rpc::Status {
            code: code.grpc_code() as i32,
            message: message.to_owned(),
        }),
        http_response: Some(HttpResponse::DeniedResponse(DeniedHttpResponse {
            status: Some(HttpStatus {
                code: http_status as i32,
            }),
            headers: vec![overwrite("content-type", "application/json")],
            body: body.to_string(),
        })),
    }
}
