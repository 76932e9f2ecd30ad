use crate::{
    error::{Result, SignerError},
    signer::{Signer, TxPayload},
};
use async_trait::async_trait;
use parity_scale_codec::Encode;
use polkahub_address::{blake2_256, AccountAddress, PublicKey};
use polkahub_config::MultisigCallIndex;
use std::sync::Arc;

#[derive(Encode, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timepoint {
    pub height: u32,
    pub index: u32,
}

#[derive(Encode, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weight {
    #[codec(compact)]
    pub ref_time: u64,
    #[codec(compact)]
    pub proof_size: u64,
}

/// An open multisig operation for some call hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigStatus {
    pub when: Timepoint,
    pub approvals: Vec<PublicKey>,
}

/// The chain state a multisig signer needs before it can wrap a call
#[async_trait]
pub trait MultisigChainApi: Send + Sync {
    async fn multisig_status(
        &self,
        multisig: &AccountAddress,
        call_hash: [u8; 32],
    ) -> Result<Option<MultisigStatus>>;

    async fn call_weight(&self, call_data: &[u8]) -> Result<Weight>;
}

/// Signs with one of the signatories, wrapping every call in `as_multi`
/// (or `as_multi_threshold_1` for 1-of-n multisigs)
#[derive(Clone)]
pub struct MultisigSigner {
    address: AccountAddress,
    threshold: u16,
    signatories: Vec<PublicKey>,
    parent: Arc<dyn Signer>,
    chain: Arc<dyn MultisigChainApi>,
    call_index: MultisigCallIndex,
}

impl std::fmt::Debug for MultisigSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultisigSigner")
            .field("address", &self.address)
            .field("threshold", &self.threshold)
            .field("signatories", &self.signatories.len())
            .finish()
    }
}

impl MultisigSigner {
    pub fn new(
        address: AccountAddress,
        threshold: u16,
        signatories: &[AccountAddress],
        parent: Arc<dyn Signer>,
        chain: Arc<dyn MultisigChainApi>,
        call_index: MultisigCallIndex,
    ) -> Result<Self> {
        let signatories: Vec<PublicKey> = signatories.iter().map(|s| *s.public_key()).collect();
        if !signatories.contains(&parent.public_key()) {
            return Err(SignerError::Other(format!(
                "signer {} is not a signatory of {address}",
                hex::encode(parent.public_key())
            )));
        }

        Ok(Self {
            address,
            threshold,
            signatories,
            parent,
            chain,
            call_index,
        })
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Sorted signatories, excluding the one that signs
    pub fn other_signatories(&self) -> Vec<PublicKey> {
        let me = self.parent.public_key();
        let mut others: Vec<PublicKey> = self
            .signatories
            .iter()
            .filter(|s| **s != me)
            .copied()
            .collect();
        others.sort();
        others.dedup();
        others
    }

    pub async fn wrap_call(&self, call_data: &[u8]) -> Result<Vec<u8>> {
        let others = self.other_signatories();

        if self.threshold <= 1 {
            let mut out = self.call_index.as_multi_threshold_1.to_bytes().to_vec();
            others.encode_to(&mut out);
            out.extend_from_slice(call_data);
            return Ok(out);
        }

        let call_hash = blake2_256(call_data);
        let status = self
            .chain
            .multisig_status(&self.address, call_hash)
            .await?;

        if let Some(status) = &status {
            if status.approvals.contains(&self.parent.public_key()) {
                return Err(SignerError::Rejected(
                    "this signatory already approved the call".to_string(),
                ));
            }
        }

        let weight = self.chain.call_weight(call_data).await?;
        let when = status.map(|s| s.when);

        tracing::debug!(
            "wrapping call in as_multi for {}, timepoint {:?}",
            self.address,
            when
        );

        let mut out = self.call_index.as_multi.to_bytes().to_vec();
        self.threshold.encode_to(&mut out);
        others.encode_to(&mut out);
        when.encode_to(&mut out);
        out.extend_from_slice(call_data);
        weight.encode_to(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl Signer for MultisigSigner {
    fn public_key(&self) -> PublicKey {
        self.parent.public_key()
    }

    async fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.parent.sign_bytes(data).await
    }

    async fn sign_tx(&self, payload: &TxPayload) -> Result<Vec<u8>> {
        let wrapped = self.wrap_call(&payload.call_data).await?;
        self.parent.sign_tx(&payload.with_call_data(wrapped)).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::FakeSigner;
    use polkahub_address::multisig_address;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockChain {
        status: Option<MultisigStatus>,
        requested_hashes: Mutex<Vec<[u8; 32]>>,
    }

    #[async_trait]
    impl MultisigChainApi for MockChain {
        async fn multisig_status(
            &self,
            _multisig: &AccountAddress,
            call_hash: [u8; 32],
        ) -> Result<Option<MultisigStatus>> {
            self.requested_hashes.lock().unwrap().push(call_hash);
            Ok(self.status.clone())
        }

        async fn call_weight(&self, _call_data: &[u8]) -> Result<Weight> {
            Ok(Weight {
                ref_time: 1,
                proof_size: 2,
            })
        }
    }

    fn addr(n: u8) -> AccountAddress {
        AccountAddress::from_public_key([n; 32], 42).unwrap()
    }

    fn signer(threshold: u16, chain: Arc<MockChain>) -> MultisigSigner {
        let signatories = vec![addr(3), addr(1), addr(2)];
        let address = multisig_address(&signatories, threshold).unwrap();
        MultisigSigner::new(
            address,
            threshold,
            &signatories,
            Arc::new(FakeSigner::new([2; 32])),
            chain,
            MultisigCallIndex::default(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_signatory_parent() {
        let signatories = vec![addr(1), addr(2)];
        let address = multisig_address(&signatories, 2).unwrap();
        let err = MultisigSigner::new(
            address,
            2,
            &signatories,
            Arc::new(FakeSigner::new([9; 32])),
            Arc::new(MockChain::default()),
            MultisigCallIndex::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SignerError::Other(_)));
    }

    #[test]
    fn others_are_sorted_and_exclude_self() {
        let s = signer(2, Arc::new(MockChain::default()));
        assert_eq!(s.other_signatories(), vec![[1; 32], [3; 32]]);
    }

    #[tokio::test]
    async fn threshold_one_skips_chain() {
        let chain = Arc::new(MockChain::default());
        let s = signer(1, chain.clone());
        let call = s.wrap_call(&[7, 7]).await.unwrap();

        let mut expected = vec![30, 0, 8];
        expected.extend([1; 32]);
        expected.extend([3; 32]);
        expected.extend([7, 7]);
        assert_eq!(call, expected);
        assert!(chain.requested_hashes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn as_multi_first_approval() {
        let chain = Arc::new(MockChain::default());
        let s = signer(2, chain.clone());
        let call = s.wrap_call(&[7, 7]).await.unwrap();

        let mut expected = vec![30, 1, 2, 0, 8];
        expected.extend([1; 32]);
        expected.extend([3; 32]);
        expected.push(0); // no timepoint
        expected.extend([7, 7]);
        expected.extend([4, 8]); // compact weight
        assert_eq!(call, expected);
        assert_eq!(
            chain.requested_hashes.lock().unwrap().as_slice(),
            &[blake2_256(&[7, 7])]
        );
    }

    #[tokio::test]
    async fn as_multi_uses_pending_timepoint() {
        let chain = Arc::new(MockChain {
            status: Some(MultisigStatus {
                when: Timepoint {
                    height: 5,
                    index: 1,
                },
                approvals: vec![[1; 32]],
            }),
            ..Default::default()
        });
        let s = signer(2, chain);
        let call = s.wrap_call(&[7]).await.unwrap();

        let timepoint_at = 2 + 2 + 1 + 64;
        assert_eq!(
            &call[timepoint_at..timepoint_at + 9],
            &[1, 5, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn already_approved_is_rejected() {
        let chain = Arc::new(MockChain {
            status: Some(MultisigStatus {
                when: Timepoint::default(),
                approvals: vec![[2; 32]],
            }),
            ..Default::default()
        });
        let s = signer(2, chain);
        let err = s.wrap_call(&[7]).await.unwrap_err();
        assert!(matches!(err, SignerError::Rejected(_)));
    }
}
