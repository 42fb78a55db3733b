use chrono::Duration;
use cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
const AUTH_COOKIE_PATH: &str = "/auth";

/// Keeps the refresh token in an HttpOnly cookie scoped to the auth routes.
#[derive(Debug, Clone, Copy)]
pub struct CookieService {
    secure: bool,
}

impl CookieService {
    /// `secure` should be true whenever the service is reached over HTTPS.
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn set_refresh_cookie(&self, cookies: &Cookies, refresh_token: &str, max_age: Duration) {
        cookies.add(self.create_cookie(refresh_token.to_string(), max_age));
    }

    /// Always emits an expired cookie, even when the request carried none.
    pub fn clear_refresh_cookie(&self, cookies: &Cookies) {
        let mut cookie = self.create_cookie(String::new(), Duration::zero());
        cookie.make_removal();
        cookies.add(cookie);
    }

    pub fn refresh_token(cookies: &Cookies) -> Option<String> {
        cookies
            .get(REFRESH_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn create_cookie(&self, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((REFRESH_TOKEN_COOKIE, value))
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Strict)
            .path(AUTH_COOKIE_PATH)
            .max_age(time::Duration::seconds(max_age.num_seconds()))
            .build()
    }
}
