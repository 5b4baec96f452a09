use super::{AppError, auth::AuthCtx};
use axum::response::Response;
use axum::{
    extract::OriginalUri,
    http::{Method, Request},
    middleware::Next,
};
use swasthya_shared::auth::Role;

/// Role gate over the private API. Path-shape rules only; ownership checks
/// (a worker touching another worker's records) live in the handlers, where
/// the row's submitter is known.
pub async fn enforce_acl(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|orig| orig.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();
    let Some(auth) = req.extensions().get::<AuthCtx>() else {
        return Err(AppError::unauthorized());
    };
    let claims = &auth.claims;

    let segs = segmented(&path);
    let api_prefix = ["api", "v1"];
    if !segs.as_slice().starts_with(&api_prefix) {
        tracing::warn!(?segs, "ACL: path outside API scope");
        return Err(AppError::forbidden());
    }
    let rest = &segs[api_prefix.len()..];

    let decision = match claims.role {
        Role::Worker => allow_worker(&method, rest),
        Role::Admin => allow_admin(&method, rest),
    };

    if let Err(err) = decision {
        tracing::warn!(
            method = %method,
            path = %path,
            username = %claims.sub,
            role = ?claims.role,
            "ACL: no rule matched; denying"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}

fn allow_worker(method: &Method, rest: &[&str]) -> Result<(), AppError> {
    match rest {
        ["records"] if *method == Method::GET || *method == Method::POST => Ok(()),
        ["records", id] if *method == Method::GET && id.parse::<i32>().is_ok() => Ok(()),
        ["records", id, "status"] if *method == Method::PUT && id.parse::<i32>().is_ok() => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn allow_admin(method: &Method, rest: &[&str]) -> Result<(), AppError> {
    match rest {
        // Admins review and reclassify, but never submit screenings.
        ["records"] if *method == Method::GET => Ok(()),
        ["records", id] if *method == Method::GET && id.parse::<i32>().is_ok() => Ok(()),
        ["records", id, "status"] if *method == Method::PUT && id.parse::<i32>().is_ok() => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn segmented(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
