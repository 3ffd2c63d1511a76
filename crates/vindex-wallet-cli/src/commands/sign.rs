//! Signing and verification commands.

use clap::Args;
use vindex_crypto::signing::{PublicKey, Signature};
use vindex_wallet::signer::verify_from_address;

use super::open_handle;
use crate::output;
use crate::prompt;
use crate::GlobalOpts;

/// The payload, given as hex or as UTF-8 text.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload bytes as hex.
    #[arg(long)]
    hex: Option<String>,
    /// Payload as UTF-8 text.
    #[arg(long)]
    text: Option<String>,
}

impl PayloadArgs {
    fn bytes(&self) -> Result<Vec<u8>, String> {
        match (&self.hex, &self.text) {
            (Some(h), _) => hex::decode(h.trim()).map_err(|e| format!("invalid payload hex: {e}")),
            (None, Some(t)) => Ok(t.as_bytes().to_vec()),
            (None, None) => Err("no payload given".into()),
        }
    }
}

pub async fn sign(opts: &GlobalOpts, payload: &PayloadArgs) -> Result<(), String> {
    let bytes = payload.bytes()?;
    let handle = open_handle(opts)?;

    let password = prompt::read_password("Password: ")?;
    handle
        .unlock(password.as_str())
        .await
        .map_err(|e| e.to_string())?;
    let signed = handle.sign(bytes).await;
    handle.lock().await.map_err(|e| e.to_string())?;
    let signed = signed.map_err(|e| e.to_string())?;

    let view = signed.to_hex_view();
    output::print_fields(
        &[
            ("address", view.address),
            ("public_key", view.public_key),
            ("signature", view.signature),
        ],
        opts.json,
    );
    Ok(())
}

pub fn verify(
    opts: &GlobalOpts,
    address: &str,
    public_key: &str,
    signature: &str,
    payload: &PayloadArgs,
) -> Result<(), String> {
    let bytes = payload.bytes()?;
    let public_key = PublicKey::from_hex(public_key).map_err(|e| e.to_string())?;
    let signature = Signature::from_hex(signature).map_err(|e| e.to_string())?;

    verify_from_address(
        address,
        &opts.wallet_config.address_prefix,
        &public_key,
        &bytes,
        &signature,
    )
    .map_err(|e| e.to_string())?;

    output::print_success("signature is valid", opts.json);
    Ok(())
}
