//! Gateway protocol codec: canonical form encoding, request signing, and the
//! hosted-payment-page hash chain.
//!
//! Two independent cryptographic contracts coexist here, selected by
//! configuration. The REST protocol signs outbound bodies with a SHA-256
//! content hash plus an RSA PKCS#1 v1.5 signature; the hosted-payment-page
//! variant authenticates both directions with a chained SHA-1 hash over a
//! contract-fixed field sequence.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::config::AuthMode;
use crate::error::{PaymentError, PaymentResult};

/// Convert a major-unit amount into gateway minor units, rounding half away
/// from zero. `12.345` becomes `1235`; `12.344` becomes `1234`.
pub fn to_minor_units(amount: Decimal) -> PaymentResult<i64> {
    let minor = (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    minor.to_i64().ok_or_else(|| PaymentError::Validation {
        message: format!("amount {} does not fit in gateway minor units", amount),
        field: Some("amount".to_string()),
    })
}

/// Percent-encode form pairs in the given order. The gateway contract fixes
/// the key order, so a map-based encoder is not usable here.
pub fn encode_form(pairs: &[(&str, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Append authentication fields to a form body, after the protocol fields.
pub fn apply_auth(form: &mut Vec<(&'static str, String)>, auth: &AuthMode) {
    match auth {
        AuthMode::Token(token) => form.push(("token", token.clone())),
        AuthMode::Credentials { username, password } => {
            form.push(("userName", username.clone()));
            form.push(("password", password.clone()));
        }
    }
}

/// `X-Hash` / `X-Signature` header values for a signed request body.
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    pub content_hash: String,
    pub signature: String,
}

impl SignatureHeaders {
    pub fn into_pairs(self) -> Vec<(String, String)> {
        vec![
            ("X-Hash".to_string(), self.content_hash),
            ("X-Signature".to_string(), self.signature),
        ]
    }
}

/// Signs request bodies for the gateway's signed REST mode. The private key
/// must be the one whose public certificate is registered with the gateway.
#[derive(Debug)]
pub struct RsaRequestSigner {
    key: RsaPrivateKey,
}

impl RsaRequestSigner {
    /// Accepts PKCS#8 or PKCS#1 PEM key material.
    pub fn from_pem(pem: &str) -> PaymentResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| PaymentError::Signing {
                message: format!("invalid RSA private key: {}", e),
            })?;
        Ok(Self { key })
    }

    /// SHA-256 digest of the body, base64 as the content hash; RSA PKCS#1
    /// v1.5 signature over the same digest, base64 as the signature.
    pub fn sign(&self, body: &str) -> PaymentResult<SignatureHeaders> {
        let digest = Sha256::digest(body.as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| PaymentError::Signing {
                message: format!("RSA signing failed: {}", e),
            })?;
        Ok(SignatureHeaders {
            content_hash: BASE64.encode(digest),
            signature: BASE64.encode(signature),
        })
    }
}

/// Outbound signing strategy, selected by configuration.
pub enum SigningStrategy {
    None,
    Rsa(RsaRequestSigner),
}

impl SigningStrategy {
    pub fn headers(&self, body: &str) -> PaymentResult<Vec<(String, String)>> {
        match self {
            SigningStrategy::None => Ok(Vec::new()),
            SigningStrategy::Rsa(signer) => Ok(signer.sign(body)?.into_pairs()),
        }
    }
}

fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Browser-submitted return form from the hosted payment page.
#[derive(Debug, Clone, Deserialize)]
pub struct HppReturnForm {
    #[serde(rename = "TIMESTAMP")]
    pub timestamp: String,
    #[serde(rename = "MERCHANT_ID")]
    pub merchant_id: String,
    #[serde(rename = "ORDER_ID")]
    pub order_id: String,
    #[serde(rename = "RESULT")]
    pub result: String,
    #[serde(rename = "MESSAGE")]
    pub message: String,
    #[serde(rename = "PASREF")]
    pub pas_ref: String,
    #[serde(rename = "AUTHCODE")]
    pub auth_code: String,
    #[serde(rename = "SHA1HASH")]
    pub sha1_hash: String,
}

impl HppReturnForm {
    /// The hosted payment page reports `"00"` for an authorised payment.
    pub fn is_authorised(&self) -> bool {
        self.result == "00"
    }
}

/// Hash-chain codec for the hosted-payment-page protocol.
///
/// Both directions compute `SHA1(SHA1(f1.f2.….fN) + "." + secret)`,
/// lowercase hex. The field sequence is gateway-contract-fixed and differs
/// per direction.
#[derive(Debug, Clone)]
pub struct HppCodec {
    merchant_id: String,
    shared_secret: String,
}

impl HppCodec {
    pub fn new(merchant_id: String, shared_secret: String) -> Self {
        Self {
            merchant_id,
            shared_secret,
        }
    }

    fn chained_hash(&self, fields: &[&str]) -> String {
        let first = sha1_hex(&fields.join("."));
        sha1_hex(&format!("{}.{}", first, self.shared_secret))
    }

    /// Outbound request hash: `timestamp.merchantId.orderId.amount.currency`.
    pub fn request_hash(
        &self,
        timestamp: &str,
        order_id: &str,
        amount_minor: &str,
        currency: &str,
    ) -> String {
        self.chained_hash(&[timestamp, &self.merchant_id, order_id, amount_minor, currency])
    }

    /// Inbound response hash:
    /// `timestamp.merchantId.orderId.result.message.pasRef.authCode`.
    /// The merchant id echoed by the form is used, matching the outbound
    /// contract for this direction.
    pub fn response_hash(&self, form: &HppReturnForm) -> String {
        self.chained_hash(&[
            &form.timestamp,
            &form.merchant_id,
            &form.order_id,
            &form.result,
            &form.message,
            &form.pas_ref,
            &form.auth_code,
        ])
    }

    /// Accept the form only if its declared hash equals the recomputed one.
    /// Hex comparison is case-insensitive per the gateway contract.
    pub fn validate_return(&self, form: &HppReturnForm) -> bool {
        self.response_hash(form)
            .eq_ignore_ascii_case(form.sha1_hash.trim())
    }
}
