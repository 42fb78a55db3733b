use std::sync::Arc;

use chrono::Duration;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::clock::Clock;
use crate::config::JwtConfig;
use crate::error::TokenError;
use crate::models::jwt::{TrackingClaims, TRACKING_PURPOSE};
use crate::utils::jwt::JwtKeys;

/// Signed, purpose-scoped tokens granting read access to a single order.
#[derive(Clone)]
pub struct TrackingTokenService {
    keys: JwtKeys,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TrackingTokenService {
    /// Uses the tracking secret, or the access secret when the config says
    /// to fall back (see [`JwtConfig::effective_tracking_secret`]).
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: JwtKeys::from_secret(config.effective_tracking_secret()),
            ttl: config.tracking_ttl,
            clock,
        }
    }

    pub fn issue(&self, order_id: &str, email: Option<&str>) -> Result<String, TokenError> {
        self.issue_with_ttl(order_id, email, self.ttl)
    }

    pub fn issue_with_ttl(
        &self,
        order_id: &str,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = TrackingClaims::new(
            order_id.to_string(),
            email.map(str::to_string),
            self.clock.now(),
            ttl,
        );
        self.keys.encode(&claims)
    }

    /// Signature, expiry, then the purpose literal. A validly signed token
    /// minted for anything else fails with [`TokenError::WrongPurpose`].
    pub fn verify(&self, token: &str) -> Result<TrackingClaims, TokenError> {
        let claims = self
            .keys
            .decode::<TrackingClaims>(token, self.clock.now())
            .inspect_err(|e| debug!(reason = %e, "tracking token rejected"))?;

        if claims.purpose != TRACKING_PURPOSE {
            debug!(purpose = %claims.purpose, "tracking token has wrong purpose");
            return Err(TokenError::WrongPurpose);
        }

        Ok(claims)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Colissimo,
    Chronopost,
    MondialRelay,
    Ups,
    Dhl,
    Fedex,
    Other,
}

impl Carrier {
    /// Unknown or missing codes map to [`Carrier::Other`].
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("COLISSIMO") => Carrier::Colissimo,
            Some("CHRONOPOST") => Carrier::Chronopost,
            Some("MONDIAL_RELAY") => Carrier::MondialRelay,
            Some("UPS") => Carrier::Ups,
            Some("DHL") => Carrier::Dhl,
            Some("FEDEX") => Carrier::Fedex,
            _ => Carrier::Other,
        }
    }

    fn base_url(self) -> &'static str {
        match self {
            Carrier::Colissimo => "https://www.laposte.fr/outils/suivre-vos-envois?code=",
            Carrier::Chronopost => "https://www.chronopost.fr/fr/suivi-colis?listeNumerosLT=",
            Carrier::MondialRelay | Carrier::Other => "https://www.17track.net/fr/track#nums=",
            Carrier::Ups => "https://www.ups.com/track?loc=fr_FR&tracknum=",
            Carrier::Dhl => {
                "https://www.dhl.com/fr-fr/home/tracking/tracking-express.html?submit=1&tracking-id="
            }
            Carrier::Fedex => "https://www.fedex.com/fedextrack/?trknbr=",
        }
    }
}

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Carrier tracking page for a parcel, or `None` when there is no number yet.
pub fn build_tracking_url(carrier: Option<&str>, tracking_number: Option<&str>) -> Option<String> {
    let number = tracking_number.filter(|n| !n.trim().is_empty())?;
    let base = Carrier::from_code(carrier).base_url();
    Some(format!("{base}{}", utf8_percent_encode(number, URI_COMPONENT)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_number_has_no_url() {
        assert_eq!(build_tracking_url(Some("COLISSIMO"), None), None);
        assert_eq!(build_tracking_url(Some("COLISSIMO"), Some("")), None);
        assert_eq!(build_tracking_url(Some("COLISSIMO"), Some("   ")), None);
    }

    #[test]
    fn carrier_specific_urls() {
        assert_eq!(
            build_tracking_url(Some("COLISSIMO"), Some("ABC123")).as_deref(),
            Some("https://www.laposte.fr/outils/suivre-vos-envois?code=ABC123")
        );
        assert_eq!(
            build_tracking_url(Some("CHRONOPOST"), Some("XYZ789")).as_deref(),
            Some("https://www.chronopost.fr/fr/suivi-colis?listeNumerosLT=XYZ789")
        );
        assert_eq!(
            build_tracking_url(Some("MONDIAL_RELAY"), Some("MR456")).as_deref(),
            Some("https://www.17track.net/fr/track#nums=MR456")
        );
    }

    #[test]
    fn encodes_special_characters() {
        let url = build_tracking_url(Some("COLISSIMO"), Some("ABC 123/456")).unwrap();
        assert!(url.ends_with("ABC%20123%2F456"));

        let url = build_tracking_url(None, Some("a-b_c.d!e~f*g'h(i)&é")).unwrap();
        assert!(url.ends_with("a-b_c.d!e~f*g'h(i)%26%C3%A9"));
    }

    #[test]
    fn unknown_or_missing_carrier_uses_generic_tracker() {
        let expected = Some("https://www.17track.net/fr/track#nums=TRACK123");
        assert_eq!(
            build_tracking_url(Some("UNKNOWN_CARRIER"), Some("TRACK123")).as_deref(),
            expected
        );
        assert_eq!(build_tracking_url(None, Some("TRACK123")).as_deref(), expected);
    }
}
