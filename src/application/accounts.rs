use crate::domain::account::Account;
use crate::domain::ports::{AccountStoreRef, IdentityProviderRef};
use crate::error::{EngineError, Result};

/// Registration against the identity collaborator.
///
/// The engine never sees raw credentials beyond handing them to the
/// provider; a verified identity plus an optional referral code is all it
/// takes to mint an account.
pub struct AccountService {
    accounts: AccountStoreRef,
    identity: IdentityProviderRef,
}

impl AccountService {
    pub fn new(accounts: AccountStoreRef, identity: IdentityProviderRef) -> Self {
        Self { accounts, identity }
    }

    pub async fn register(
        &self,
        credential: &str,
        referral_code: Option<&str>,
    ) -> Result<Account> {
        let identity = self.identity.verify(credential).await?;

        if let Some(existing) = self.accounts.by_external_id(&identity.external_id).await? {
            return Ok(existing);
        }

        let referred_by = match referral_code {
            Some(code) => Some(
                self.accounts
                    .by_referral_code(code)
                    .await?
                    .ok_or(EngineError::InvalidReferralCode)?
                    .id,
            ),
            None => None,
        };

        let mut account = Account::new(identity.external_id, identity.email);
        account.referred_by = referred_by;
        self.accounts.store(account.clone()).await?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::collaborators::StaticIdentity;
    use crate::infrastructure::in_memory::InMemoryAccountStore;
    use std::sync::Arc;

    fn service() -> (AccountService, Arc<StaticIdentity>) {
        let identity = Arc::new(StaticIdentity::new());
        let provider: IdentityProviderRef = identity.clone();
        let service = AccountService::new(Arc::new(InMemoryAccountStore::new()), provider);
        (service, identity)
    }

    #[tokio::test]
    async fn register_links_referrer_by_code() {
        let (service, identity) = service();
        identity.insert("tok-a", "uid-a", "a@example.com");
        identity.insert("tok-b", "uid-b", "b@example.com");

        let referrer = service.register("tok-a", None).await.unwrap();
        let referred = service
            .register("tok-b", Some(&referrer.referral_code))
            .await
            .unwrap();
        assert_eq!(referred.referred_by, Some(referrer.id));
        assert!(!referred.activated);
    }

    #[tokio::test]
    async fn register_is_idempotent_per_external_id() {
        let (service, identity) = service();
        identity.insert("tok-a", "uid-a", "a@example.com");
        let first = service.register("tok-a", None).await.unwrap();
        let second = service.register("tok-a", None).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn bad_credential_and_bad_code_are_rejected() {
        let (service, identity) = service();
        identity.insert("tok-a", "uid-a", "a@example.com");
        assert!(matches!(
            service.register("missing", None).await,
            Err(EngineError::InvalidCredential)
        ));
        assert!(matches!(
            service.register("tok-a", Some("NOPE")).await,
            Err(EngineError::InvalidReferralCode)
        ));
    }
}
