//! Recoverable ECDSA signatures over transactions
//!
//! Account transactions carry a `(v, r, s)` triple. Replay protected
//! signatures fold the chain's sign parameter `N` into `v` as
//! `35 + 2N + parity` and into the signed digest as a trailing `[N, 0, 0]`;
//! legacy signatures use `v = 27 + parity` over the bare fields.

use std::fmt;
use std::sync::RwLock;

use ensure_macro::ensure;
use log::info;
use once_cell::sync::OnceCell;
use primitive_types::U256;

use codec::{Encoder, Rlp, RlpIter};
use crypto::{
    keccak,
    secp256k1::{self, PrivateKey, SIGNATURE_LEN},
    Address, Hash,
};

use crate::{Error, Result};

/// A transaction whose fields are covered by an account signature
pub trait SignFields {
    /// Appends the signed fields, without list framing, to `s`
    fn sign_fields(&self, s: &mut Encoder);
}

/// How `v` and the signed digest are formed
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Signer {
    /// Legacy signatures, `s` may lie in the upper half
    Frontier,
    /// Legacy signatures with low `s`
    Homestead,
    /// Replay protected signatures bound to a sign parameter
    Replay(u64),
}

impl Signer {
    /// A replay protected signer for `sign_param`
    pub fn new(sign_param: u64) -> Self {
        Signer::Replay(sign_param)
    }

    /// The sign parameter, zero for legacy signers
    pub fn sign_param(&self) -> u64 {
        match self {
            Signer::Replay(n) => *n,
            _ => 0,
        }
    }

    /// The digest signed for `tx`
    pub fn hash<T: SignFields + ?Sized>(&self, tx: &T) -> Hash {
        let mut s = Encoder::new();
        s.begin_list();
        tx.sign_fields(&mut s);
        if let Signer::Replay(n) = self {
            s.append(n).append(&0u8).append(&0u8);
        }
        s.end_list();
        keccak(s.out())
    }

    /// Splits a raw `r || s || recovery id` signature, encoding `v`
    pub fn signature_values(&self, sig: &[u8; SIGNATURE_LEN]) -> SignData {
        let base = match self {
            Signer::Replay(n) => U256::from(*n) * U256::from(2) + U256::from(35),
            _ => U256::from(27),
        };
        SignData {
            v: base + U256::from(sig[64]),
            r: U256::from_big_endian(&sig[..32]),
            s: U256::from_big_endian(&sig[32..64]),
        }
    }

    /// Signs `tx` with `key`
    pub fn sign<T: SignFields + ?Sized>(&self, tx: &T, key: &PrivateKey) -> Result<SignData> {
        let sig = key.sign(&self.hash(tx))?;
        Ok(self.signature_values(&sig))
    }

    /// Recovers the address that signed `tx`
    ///
    /// A replay protected signer still accepts legacy signatures, but
    /// rejects protected signatures made for another sign parameter.
    pub fn sender<T: SignFields + ?Sized>(&self, tx: &T, data: &SignData) -> Result<Address> {
        match self {
            Signer::Replay(n) => {
                if !data.is_protected() {
                    return Signer::Homestead.sender(tx, data);
                }
                ensure!(data.sign_param() == Some(*n), Error::InvalidSignParam);
                let v = data.v - U256::from(*n) * U256::from(2) - U256::from(8);
                recover_plain(&self.hash(tx), data, v, true)
            }
            Signer::Homestead => recover_plain(&self.hash(tx), data, data.v, true),
            Signer::Frontier => recover_plain(&self.hash(tx), data, data.v, false),
        }
    }
}

fn recover_plain(hash: &Hash, data: &SignData, v: U256, homestead: bool) -> Result<Address> {
    ensure!(v.bits() <= 8, Error::InvalidSig);
    let v = v.low_u64() as u8;
    ensure!(v >= 27, Error::InvalidSig);

    let (r, s) = (to_bytes(&data.r), to_bytes(&data.s));
    ensure!(
        secp256k1::validate_signature_values(v - 27, &r, &s, homestead),
        Error::InvalidSig
    );
    Ok(secp256k1::recover(hash, &r, &s, v - 27)?)
}

fn to_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// The `(v, r, s)` triple carried by account transactions
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SignData {
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl SignData {
    /// `v` was formed by a replay protected signer
    pub fn is_protected(&self) -> bool {
        if self.v.bits() <= 8 {
            let v = self.v.low_u64();
            v != 27 && v != 28
        } else {
            true
        }
    }

    /// The sign parameter folded into `v`, if any
    pub fn sign_param(&self) -> Option<u64> {
        if !self.is_protected() {
            return Some(0);
        }
        if self.v < U256::from(35) {
            return None;
        }
        let n = (self.v - U256::from(35)) / U256::from(2);
        if n.bits() > 64 {
            None
        } else {
            Some(n.low_u64())
        }
    }

    /// Nothing has been signed yet
    pub fn is_empty(&self) -> bool {
        self.v.is_zero() && self.r.is_zero() && self.s.is_zero()
    }

    /// Appends `v, r, s` to an open list
    pub fn append_to(&self, s: &mut Encoder) {
        s.append(&self.v).append(&self.r).append(&self.s);
    }

    /// Reads `v, r, s` from an open list
    pub fn read_from(fields: &mut RlpIter) -> codec::Result<Self> {
        Ok(SignData {
            v: fields.next_val()?,
            r: fields.next_val()?,
            s: fields.next_val()?,
        })
    }
}

impl codec::Encodable for SignData {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list();
        self.append_to(s);
        s.end_list();
    }
}

impl codec::Decodable for SignData {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let data = SignData::read_from(&mut fields)?;
        fields.finish()?;
        Ok(data)
    }
}

/// Sender recovered by a signer, reused until a different signer asks
#[derive(Default)]
pub struct SenderCache(RwLock<Option<(Signer, Address)>>);

impl SenderCache {
    pub fn get(&self, signer: &Signer) -> Option<Address> {
        let slot = self.0.read().ok()?;
        match *slot {
            Some((cached, address)) if cached == *signer => Some(address),
            _ => None,
        }
    }

    pub fn set(&self, signer: Signer, address: Address) {
        if let Ok(mut slot) = self.0.write() {
            *slot = Some((signer, address));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.0.write() {
            *slot = None;
        }
    }

    /// Consults the cache, recovering and storing on a miss
    pub fn get_or_recover<F>(&self, signer: &Signer, recover: F) -> Result<Address>
    where
        F: FnOnce() -> Result<Address>,
    {
        if let Some(address) = self.get(signer) {
            return Ok(address);
        }
        let address = recover()?;
        self.set(*signer, address);
        Ok(address)
    }

    fn snapshot(&self) -> Option<(Signer, Address)> {
        self.0.read().ok().and_then(|slot| *slot)
    }
}

impl Clone for SenderCache {
    fn clone(&self) -> Self {
        SenderCache(RwLock::new(self.snapshot()))
    }
}

impl fmt::Debug for SenderCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.snapshot() {
            Some((signer, address)) => write!(f, "SenderCache({:?}, {})", signer, address),
            None => f.write_str("SenderCache(empty)"),
        }
    }
}

static SIGN_PARAM: OnceCell<u64> = OnceCell::new();

/// Fixes the process wide sign parameter
///
/// Only the first call has an effect; the parameter in force is returned.
pub fn init_sign_param(sign_param: u64) -> u64 {
    *SIGN_PARAM.get_or_init(|| {
        info!("Using sign param {}", sign_param);
        sign_param
    })
}

/// The process wide sign parameter
///
/// # Panics
/// If [`init_sign_param`] has not been called
pub fn sign_param() -> u64 {
    *SIGN_PARAM
        .get()
        .expect("init_sign_param must be called at process start")
}

/// A signer for the process wide sign parameter
pub fn global_signer() -> Signer {
    Signer::new(sign_param())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::Transfer;

    fn eip155_tx() -> Transfer {
        Transfer::new(
            9,
            Some("3535353535353535353535353535353535353535".parse().unwrap()),
            U256::from_dec_str("1000000000000000000").unwrap(),
            21000,
            U256::from(20_000_000_000u64),
            Vec::new(),
        )
    }

    #[test]
    fn it_hashes_replay_protected_fields() {
        let tx = eip155_tx();
        assert_eq!(
            hex::encode(Signer::new(1).hash(&tx).as_bytes()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn it_signs_replay_protected() {
        let key = PrivateKey::from_hex(
            "4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let signer = Signer::new(1);
        let mut tx = eip155_tx();
        tx.sign(&signer, &key).unwrap();

        assert_eq!(tx.signature().v, U256::from(37));
        assert_eq!(
            hex::encode(codec::encode(&tx)),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a7640000\
             8025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d899\
             7f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(tx.sender(&signer).unwrap(), key.address());
    }

    #[test]
    fn it_rejects_foreign_sign_params() {
        let key = PrivateKey::random();
        let mut tx = eip155_tx();
        tx.sign(&Signer::new(30261), &key).unwrap();

        assert_eq!(tx.signature().sign_param(), Some(30261));
        assert_eq!(tx.sender(&Signer::new(1)), Err(Error::InvalidSignParam));
        assert_eq!(tx.sender(&Signer::new(30261)).unwrap(), key.address());
    }

    #[test]
    fn it_accepts_legacy_signatures_under_replay_signers() {
        let key = PrivateKey::random();
        let mut tx = eip155_tx();
        tx.sign(&Signer::Homestead, &key).unwrap();

        assert!(!tx.signature().is_protected());
        assert_eq!(tx.sender(&Signer::new(7)).unwrap(), key.address());
        assert_eq!(tx.sender(&Signer::Frontier).unwrap(), key.address());
    }

    #[test]
    fn it_rejects_malformed_v() {
        let mut tx = eip155_tx();
        tx.sign(&Signer::Homestead, &PrivateKey::random()).unwrap();
        let mut data = *tx.signature();
        data.v = U256::from(29);
        assert!(Signer::Homestead.sender(&tx, &data).is_err());
        data.v = U256::from(300);
        assert_eq!(Signer::Homestead.sender(&tx, &data), Err(Error::InvalidSig));
    }

    #[test]
    fn it_caches_per_signer() {
        let cache = SenderCache::default();
        let address = Address::from_name(b"a");
        cache.set(Signer::new(1), address);
        assert_eq!(cache.get(&Signer::new(1)), Some(address));
        assert_eq!(cache.get(&Signer::new(2)), None);

        let other = Address::from_name(b"b");
        let got = cache
            .get_or_recover(&Signer::new(2), || Ok(other))
            .unwrap();
        assert_eq!(got, other);
        assert_eq!(cache.get(&Signer::new(1)), None);
        assert_eq!(cache.clone().get(&Signer::new(2)), Some(other));
    }

    #[test]
    fn it_fixes_the_sign_param_once() {
        let first = init_sign_param(crate::params::TEST_NET_SIGN_PARAM);
        assert_eq!(init_sign_param(1), first);
        assert_eq!(global_signer(), Signer::new(first));
    }
}
