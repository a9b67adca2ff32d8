//! Local node wallet: one secp256k1 key, loaded or generated once at startup.

use crate::crypto::KeyPair;
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// On-disk form of the wallet key file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletFile {
    address: String,
    secret_key_hex: String,
    created: String,
}

#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: KeyPair,
    address: String,
    created: String,
}

impl Wallet {
    /// A fresh wallet that lives only in memory.
    pub fn generate() -> Self {
        Self::from_keypair(KeyPair::generate(), chrono::Utc::now().to_rfc3339())
    }

    fn from_keypair(keypair: KeyPair, created: String) -> Self {
        let address = keypair.address();
        Wallet {
            keypair,
            address,
            created,
        }
    }

    /// Restores the wallet at `path`, creating and persisting a new key if
    /// the file does not exist yet.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let wallet = Self::load(path)?;
            info!("Restored wallet {} from {}", wallet.address, path.display());
            Ok(wallet)
        } else {
            let wallet = Self::generate();
            wallet.save(path)?;
            info!("Created wallet {} at {}", wallet.address, path.display());
            Ok(wallet)
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let file: WalletFile = serde_json::from_str(&contents)?;
        let keypair = KeyPair::from_secret_hex(&file.secret_key_hex)?;

        if keypair.address() != file.address {
            return Err(ChainError::WalletError(
                "Stored address does not match the stored secret key".to_string(),
            ));
        }
        Ok(Self::from_keypair(keypair, file.created))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = WalletFile {
            address: self.address.clone(),
            secret_key_hex: self.keypair.secret_key_hex(),
            created: self.created.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn created(&self) -> &str {
        &self.created
    }

    /// Signs a hex digest with the wallet key.
    pub fn sign(&self, payload_hex: &str) -> Result<String> {
        self.keypair.sign(payload_hex)
    }
}
