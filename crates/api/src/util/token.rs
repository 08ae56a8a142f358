use super::query;
use alloc::string::String;
use hyper::Request;

const ADMIN_HEADER: &str = "x-admin-token";
const ADMIN_PARAM: &str = "admin_token";

/// Extracts the admin secret from the `X-Admin-Token` header, falling back to
/// the `admin_token` query parameter.
pub fn extract_admin_token<B>(req: &Request<B>) -> Option<String> {
    if let Some(value) = req.headers().get(ADMIN_HEADER) {
        return value.to_str().ok().map(String::from);
    }
    query::get(req.uri().query()?, ADMIN_PARAM)
}

#[cfg(test)]
mod tests {
    use super::extract_admin_token;
    use hyper::Request;

    #[test]
    fn header_takes_precedence() {
        let req = Request::post("/admin/start?admin_token=query").header("X-Admin-Token", "header").body(()).unwrap();
        assert_eq!(extract_admin_token(&req).as_deref(), Some("header"));

        let req = Request::post("/admin/start?admin_token=se%20cret").body(()).unwrap();
        assert_eq!(extract_admin_token(&req).as_deref(), Some("se cret"));

        let req = Request::post("/admin/start").body(()).unwrap();
        assert_eq!(extract_admin_token(&req), None);
    }
}
