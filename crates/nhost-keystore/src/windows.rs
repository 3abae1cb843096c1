//! Windows Credential Vault implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

/// ERROR_NOT_FOUND as surfaced by the WinRT credential APIs.
const ERROR_NOT_FOUND: u32 = 0x80070490;

/// Credential Vault based secure storage for Windows.
pub struct CredentialStorage {
    resource_name: String,
}

impl CredentialStorage {
    /// Create a new Credential Vault storage instance.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        // Verify we can access the vault
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Failed to access Credential Vault: {}", e))
        })?;

        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn get_vault(&self) -> StorageResult<PasswordVault> {
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Failed to access Credential Vault: {}", e))
        })
    }
}

impl SecureStorage for CredentialStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Setting credential");

        let vault = self.get_vault()?;

        // Delete existing credential first (ignore errors if it doesn't exist)
        let _ = self.delete(key);

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(&self.resource_name),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StorageError::Platform(format!("Failed to create credential: {}", e)))?;

        vault
            .Add(&credential)
            .map_err(|e| StorageError::Platform(format!("Failed to add credential: {}", e)))?;

        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(resource = %self.resource_name, key = %key, "Getting credential");

        let vault = self.get_vault()?;

        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                // RetrievePassword populates the Password field
                credential.RetrievePassword().map_err(|e| {
                    StorageError::Platform(format!("Failed to retrieve password: {}", e))
                })?;

                let password = credential
                    .Password()
                    .map_err(|e| StorageError::Platform(format!("Failed to get password: {}", e)))?;

                Ok(Some(password.to_string()))
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(None),
            Err(e) => Err(StorageError::Platform(format!(
                "Failed to retrieve credential: {}",
                e
            ))),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting credential");

        let vault = self.get_vault()?;

        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                vault.Remove(&credential).map_err(|e| {
                    StorageError::Platform(format!("Failed to remove credential: {}", e))
                })?;
                Ok(true)
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(false),
            Err(e) => Err(StorageError::Platform(format!(
                "Failed to find credential for deletion: {}",
                e
            ))),
        }
    }
}
