//! Bank-transfer integration helpers.
//!
//! Two narrow pieces: building the QR payment payload shown to the user at
//! transaction creation, and extracting the payment code back out of the
//! free-text transfer description the bank echoes in its webhook.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::ServiceConfig;

/// Payment reference pattern: a literal `TX` marker followed by 6-20
/// alphanumeric characters. Banks strip punctuation from transfer
/// descriptions, so the hyphen shown in the QR payload (`TX-<code>`) arrives
/// as `TX<code>`.
static TX_CODE: OnceLock<Regex> = OnceLock::new();

fn tx_code_regex() -> &'static Regex {
    TX_CODE.get_or_init(|| {
        Regex::new(r"TX([A-Za-z0-9]{6,20})").expect("payment code pattern is valid")
    })
}

/// Extract the payment code from a transfer description.
///
/// Returns `None` when no `TX<code>` token is present; callers treat that as
/// a first-class rejection, not an error.
#[must_use]
pub fn extract_payment_code(content: &str) -> Option<&str> {
    tx_code_regex()
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// The transfer description embedded in the QR payload for a payment code.
#[must_use]
pub fn payment_reference(code: &str) -> String {
    format!("TX-{code}")
}

/// Build the VietQR image URL for a transaction.
///
/// The URL embeds the amount, the `TX-<code>` reference (which the payer's
/// bank echoes back in the webhook `content`), and the receiving account
/// name, all percent-encoded by the URL builder.
///
/// # Panics
///
/// Never panics in practice: the base URL is a static literal and
/// `set_path`/`query_pairs_mut` percent-encode rather than fail.
#[must_use]
pub fn qr_image_url(config: &ServiceConfig, amount: i64, code: &str) -> String {
    let mut url =
        reqwest::Url::parse("https://img.vietqr.io/").expect("static base URL is valid");
    url.set_path(&format!(
        "image/{}-{}-compact2.jpg",
        config.bank_code, config.bank_account_number
    ));
    url.query_pairs_mut()
        .append_pair("amount", &amount.to_string())
        .append_pair("addInfo", &payment_reference(code))
        .append_pair("accountName", &config.bank_account_name);
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_from_transfer_content() {
        let content = "GOFIT TXa1b2c3d4e5f6 chuyen tien";
        assert_eq!(extract_payment_code(content), Some("a1b2c3d4e5f6"));
    }

    #[test]
    fn code_at_start_and_end_of_content() {
        assert_eq!(extract_payment_code("TXabc123def456"), Some("abc123def456"));
        assert_eq!(
            extract_payment_code("payment ref TX0123456789ab"),
            Some("0123456789ab")
        );
    }

    #[test]
    fn hyphenated_reference_does_not_match() {
        // The QR payload shows TX-<code>, but the pattern only matches the
        // bank's stripped form.
        assert_eq!(extract_payment_code("TX-a1b2c3d4e5f6"), None);
    }

    #[test]
    fn short_or_missing_token_rejected() {
        assert_eq!(extract_payment_code("TXab12"), None);
        assert_eq!(extract_payment_code("no reference here"), None);
        assert_eq!(extract_payment_code(""), None);
    }

    #[test]
    fn qr_url_embeds_amount_and_reference() {
        let config = ServiceConfig::default();
        let url = qr_image_url(&config, 100_000, "a1b2c3d4e5f6");

        assert!(url.starts_with("https://img.vietqr.io/image/MBBank-1663999999999-compact2.jpg"));
        assert!(url.contains("amount=100000"));
        assert!(url.contains("addInfo=TX-a1b2c3d4e5f6"));
        // The account name is percent-encoded.
        assert!(url.contains("accountName=GoFit+JSC") || url.contains("accountName=GoFit%20JSC"));
    }
}
