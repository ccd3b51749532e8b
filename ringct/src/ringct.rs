//! The RingCT bundle attached to confidential transactions
//!
//! Amounts handled here are already scaled down to commitment units; the
//! caller divides by the commitment change rate before committing.

use ensure_macro::ensure;
use itertools::izip;
use log::debug;
use rand::rngs::OsRng;

use crypto::{
    ecc::{hash_to_scalar, Point, Scalar, BASEPOINT_TABLE, H_TABLE, INV_EIGHT},
    keccak, Digest, Hash, Keccak256, Key, KeyImage,
};

use crate::{
    bulletproof::{self, Bulletproof},
    mlsag, ring_signature, Error, Matrix, Result, BULLETPROOF_MAX_OUTPUTS,
};

/// Signature scheme of a bundle
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RctType {
    Null = 0,
    Bulletproof = 3,
}

impl Default for RctType {
    fn default() -> Self {
        RctType::Null
    }
}

/// A one-time key together with its amount commitment
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CtKey {
    pub dest: Key,
    pub mask: Key,
}

/// Mask and amount of an output, blinded with the output's shared secret
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EcdhTuple {
    pub mask: Key,
    pub amount: Key,
}

/// Ring signature of one input
///
/// MLSAG signatures fill `ss` with one row per ring member and two columns.
/// Single member rings use one row holding the two Schnorr responses.
/// `ii` holds the key image and is restored from the input, never encoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MgSig {
    pub ss: Matrix<Key>,
    pub cc: Key,
    pub ii: Vec<Key>,
}

/// Prunable-independent part of the bundle
///
/// `message` and `mix_ring` are rebuilt by the verifier from the enclosing
/// transaction. Only the masks of `out_pk` are encoded, the destinations are
/// the outputs' one-time keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RctSigBase {
    pub rct_type: RctType,
    pub message: Hash,
    pub mix_ring: Vec<Vec<CtKey>>,
    pub ecdh_info: Vec<EcdhTuple>,
    pub out_pk: Vec<CtKey>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RctSigPrunable {
    pub bulletproofs: Vec<Bulletproof>,
    pub mgs: Vec<MgSig>,
    pub pseudo_outs: Vec<Key>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RctSig {
    pub base: RctSigBase,
    pub prunable: RctSigPrunable,
}

/// `mask * G + amount * H`
pub fn commit(amount: u64, mask: &Scalar) -> Point {
    mask * &BASEPOINT_TABLE + &Scalar::from(amount) * &*H_TABLE
}

/// `amount * H`, the commitment of a public amount
pub fn commit_to_amount(amount: u64) -> Point {
    &Scalar::from(amount) * &*H_TABLE
}

fn ecdh_secrets(shared_secret: &Scalar) -> (Scalar, Scalar) {
    let mask_secret = hash_to_scalar(shared_secret.as_bytes());
    let amount_secret = hash_to_scalar(mask_secret.as_bytes());
    (mask_secret, amount_secret)
}

/// Blinds the mask and amount of an output for its recipient
pub fn ecdh_encode(mask: &Scalar, amount: u64, shared_secret: &Scalar) -> EcdhTuple {
    let (mask_secret, amount_secret) = ecdh_secrets(shared_secret);
    EcdhTuple {
        mask: Key::from(mask + mask_secret),
        amount: Key::from(Scalar::from(amount) + amount_secret),
    }
}

/// Recovers the mask and amount blinded by [`ecdh_encode`]
pub fn ecdh_decode(tuple: &EcdhTuple, shared_secret: &Scalar) -> Result<(Scalar, u64)> {
    let (mask_secret, amount_secret) = ecdh_secrets(shared_secret);
    let mask = tuple.mask.to_canonical_scalar()? - mask_secret;
    let amount = (tuple.amount.to_canonical_scalar()? - amount_secret).to_bytes();

    ensure!(amount[8..].iter().all(|b| *b == 0), Error::InvalidAmount);
    let mut le = [0u8; 8];
    le.copy_from_slice(&amount[..8]);
    Ok((mask, u64::from_le_bytes(le)))
}

impl MgSig {
    fn from_mlsag(signature: mlsag::Signature) -> Self {
        let s = &signature.s;
        MgSig {
            ss: Matrix::from_fn(s.rows(), s.cols(), |row, col| Key::from(s[(row, col)])),
            cc: Key::from(signature.c),
            ii: signature.key_images.iter().map(Key::from).collect(),
        }
    }

    fn from_short(signature: ring_signature::Signature, key_image: &KeyImage) -> Self {
        MgSig {
            ss: Matrix::from_fn(1, 2, |_, col| Key::from(signature.s[col])),
            cc: Key::from(signature.c),
            ii: vec![Key::from(key_image)],
        }
    }

    fn to_mlsag(&self) -> Result<mlsag::Signature> {
        let mut s = Matrix::from_fn(self.ss.rows(), self.ss.cols(), |_, _| Scalar::zero());
        for row in 0..self.ss.rows() {
            for col in 0..self.ss.cols() {
                s[(row, col)] = self.ss[(row, col)].to_canonical_scalar()?;
            }
        }
        Ok(mlsag::Signature {
            s,
            c: self.cc.to_canonical_scalar()?,
            key_images: self
                .ii
                .iter()
                .map(Key::decompress)
                .collect::<crypto::Result<_>>()?,
        })
    }

    fn to_short(&self) -> Result<(ring_signature::Signature, KeyImage)> {
        ensure!(
            self.ss.rows() == 1 && self.ss.cols() == 2 && self.ii.len() == 1,
            Error::InconsistentSignature
        );
        let signature = ring_signature::Signature {
            c: self.cc.to_canonical_scalar()?,
            s: [
                self.ss[(0, 0)].to_canonical_scalar()?,
                self.ss[(0, 1)].to_canonical_scalar()?,
            ],
        };
        Ok((signature, self.ii[0].decompress()?))
    }
}

/// Digest signed by every input's ring signature
///
/// Covers the transaction prefix hash, the encoded base and every field of
/// the range proofs.
pub fn get_pre_mlsag_hash(rv: &RctSig) -> Hash {
    let mut proofs = Keccak256::new();
    for proof in &rv.prunable.bulletproofs {
        for key in &[proof.A, proof.S, proof.T1, proof.T2, proof.taux, proof.mu] {
            proofs.input(key.as_bytes());
        }
        proof.L.iter().for_each(|key| proofs.input(key.as_bytes()));
        proof.R.iter().for_each(|key| proofs.input(key.as_bytes()));
        for key in &[proof.a, proof.b, proof.t] {
            proofs.input(key.as_bytes());
        }
    }

    let mut hasher = Keccak256::new();
    hasher.input(rv.base.message.as_bytes());
    hasher.input(keccak(codec::encode(&rv.base)).as_bytes());
    hasher.input(Hash::from_hasher(proofs).as_bytes());
    Hash::from_hasher(hasher)
}

/// Checks the shape of the bundle and its range proof
pub fn ver_rct_semantics_simple(rv: &RctSig) -> Result<()> {
    let RctSig { base, prunable } = rv;
    ensure!(base.rct_type == RctType::Bulletproof, Error::UnsupportedType);
    ensure!(
        base.out_pk.len() == base.ecdh_info.len(),
        Error::InconsistentSignature
    );
    ensure!(
        prunable.pseudo_outs.len() == prunable.mgs.len(),
        Error::InconsistentSignature
    );
    ensure!(
        base.out_pk.len() <= BULLETPROOF_MAX_OUTPUTS,
        Error::TooManyOutputs
    );

    if base.out_pk.is_empty() {
        ensure!(prunable.bulletproofs.is_empty(), Error::InconsistentSignature);
        return Ok(());
    }

    ensure!(
        prunable.bulletproofs.len() == 1,
        Error::InvalidRangeProof("Expected exactly one range proof")
    );
    let mut proof = prunable.bulletproofs[0].clone();
    ensure!(
        proof.L.len() >= 6,
        Error::InvalidRangeProof("Range proof has too few rounds")
    );
    let extra = proof.L.len() - 6;
    ensure!(
        extra < 8 && (1usize << extra) >= base.out_pk.len(),
        Error::InvalidRangeProof("Range proof does not cover every output")
    );

    proof.V = base
        .out_pk
        .iter()
        .map(|pk| pk.mask.decompress().map(|c| Key::from(c * *INV_EIGHT)))
        .collect::<crypto::Result<_>>()?;

    bulletproof::verify(&proof)
}

fn ring_matrix(ring: &[CtKey], pseudo_out: &Point) -> Result<Matrix<Key>> {
    let rows = ring
        .iter()
        .map(|member| -> Result<Vec<Key>> {
            Ok(vec![
                member.dest,
                Key::from(member.mask.decompress()? - pseudo_out),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    Matrix::from_rows(rows).ok_or(Error::InconsistentParameters)
}

fn ver_rct_mg_simple(message: &Hash, ring: &[CtKey], pseudo_out: &Key, mg: &MgSig) -> Result<()> {
    let matrix = ring_matrix(ring, &pseudo_out.decompress()?)?;
    mlsag::verify(message.as_bytes(), &matrix, &mg.to_mlsag()?, 1)
}

fn ver_rct_short_simple(
    message: &Hash,
    member: &CtKey,
    pseudo_out: &Key,
    mg: &MgSig,
) -> Result<()> {
    let diff = Key::from(member.mask.decompress()? - pseudo_out.decompress()?);
    let (signature, key_image) = mg.to_short()?;
    ring_signature::check_ring_signature(
        message.as_bytes(),
        &member.dest,
        &diff,
        &key_image,
        &signature,
    )
}

/// Verifies the ring signature of every input against `mix_ring`
///
/// Rings with a single member carry the short signature, larger rings an
/// MLSAG over `[dest, mask - pseudo_out]`.
pub fn ver_rct_non_semantics_simple(rv: &RctSig) -> Result<()> {
    let mix_ring = &rv.base.mix_ring;
    let RctSigPrunable {
        mgs, pseudo_outs, ..
    } = &rv.prunable;
    ensure!(
        mix_ring.len() == mgs.len() && pseudo_outs.len() == mgs.len(),
        Error::InconsistentSignature
    );

    let message = get_pre_mlsag_hash(rv);
    for (i, (ring, pseudo_out, mg)) in izip!(mix_ring, pseudo_outs, mgs).enumerate() {
        let result = match ring.len() {
            0 => Err(Error::InconsistentSignature),
            1 => ver_rct_short_simple(&message, &ring[0], pseudo_out, mg),
            _ => ver_rct_mg_simple(&message, ring, pseudo_out, mg),
        };
        if let Err(e) = &result {
            debug!("Ring signature of input {} rejected: {}", i, e);
        }
        result?;
    }
    Ok(())
}

/// A new output to commit to
#[derive(Clone, Debug)]
pub struct Destination {
    /// One-time key of the output
    pub key: Key,
    /// Amount in commitment units
    pub amount: u64,
    /// Secret shared with the recipient, blinds the ECDH tuple
    pub shared_secret: Scalar,
}

/// What the spender knows about one input
#[derive(Clone, Debug)]
pub struct InputSecret {
    /// Ring members, the real one at `real_index`
    pub ring: Vec<CtKey>,
    pub real_index: usize,
    /// One-time secret key of the real member
    pub secret: Scalar,
    /// Commitment mask of the real member
    pub mask: Scalar,
    /// Amount of the real member in commitment units
    pub amount: u64,
}

/// Builds a complete bundle spending `inputs` into `destinations`
///
/// Output masks are random; pseudo output masks are chosen so that they add
/// up to the output masks. Returns the bundle and the sum of the output
/// masks, which an account input uses as its own blinding factor when there
/// are no ring inputs.
pub fn gen_rct_simple(
    message: Hash,
    inputs: &[InputSecret],
    destinations: &[Destination],
) -> Result<(RctSig, Scalar)> {
    ensure!(
        destinations.len() <= BULLETPROOF_MAX_OUTPUTS,
        Error::TooManyOutputs
    );
    for input in inputs {
        ensure!(
            input.real_index < input.ring.len(),
            Error::InconsistentParameters
        );
    }

    let out_masks: Vec<Scalar> = destinations
        .iter()
        .map(|_| Scalar::random(&mut OsRng))
        .collect();
    let out_mask_sum: Scalar = out_masks.iter().sum();

    let out_pk = destinations
        .iter()
        .zip(&out_masks)
        .map(|(dest, mask)| CtKey {
            dest: dest.key,
            mask: Key::from(commit(dest.amount, mask)),
        })
        .collect();
    let ecdh_info = destinations
        .iter()
        .zip(&out_masks)
        .map(|(dest, mask)| ecdh_encode(mask, dest.amount, &dest.shared_secret))
        .collect();

    let bulletproofs = if destinations.is_empty() {
        Vec::new()
    } else {
        let amounts: Vec<u64> = destinations.iter().map(|dest| dest.amount).collect();
        let mut proof = bulletproof::prove(&amounts, &out_masks)?;
        proof.V.clear();
        vec![proof]
    };

    let mut pseudo_masks: Vec<Scalar> = Vec::with_capacity(inputs.len());
    if !inputs.is_empty() {
        for _ in 1..inputs.len() {
            pseudo_masks.push(Scalar::random(&mut OsRng));
        }
        let partial: Scalar = pseudo_masks.iter().sum();
        pseudo_masks.push(out_mask_sum - partial);
    }
    let pseudo_points: Vec<Point> = inputs
        .iter()
        .zip(&pseudo_masks)
        .map(|(input, mask)| commit(input.amount, mask))
        .collect();

    let mut rv = RctSig {
        base: RctSigBase {
            rct_type: RctType::Bulletproof,
            message,
            mix_ring: inputs.iter().map(|input| input.ring.clone()).collect(),
            ecdh_info,
            out_pk,
        },
        prunable: RctSigPrunable {
            bulletproofs,
            mgs: Vec::with_capacity(inputs.len()),
            pseudo_outs: pseudo_points.iter().map(Key::from).collect(),
        },
    };

    let pre_mlsag = get_pre_mlsag_hash(&rv);
    for (input, pseudo_out, pseudo_mask) in izip!(inputs, &pseudo_points, &pseudo_masks) {
        let real = &input.ring[input.real_index];
        let mg = if input.ring.len() == 1 {
            let diff = Key::from(real.mask.decompress()? - pseudo_out);
            let (signature, key_image) = ring_signature::generate_ring_signature(
                pre_mlsag.as_bytes(),
                &real.dest,
                &diff,
                &input.secret,
                &(input.mask - pseudo_mask),
            )?;
            MgSig::from_short(signature, &key_image)
        } else {
            let matrix = ring_matrix(&input.ring, pseudo_out)?;
            let signature = mlsag::sign(
                pre_mlsag.as_bytes(),
                &matrix,
                input.real_index,
                &[input.secret, input.mask - pseudo_mask],
                1,
            )?;
            MgSig::from_mlsag(signature)
        };
        rv.prunable.mgs.push(mg);
    }

    debug!(
        "Built RingCT bundle with {} inputs and {} outputs",
        inputs.len(),
        destinations.len()
    );
    Ok((rv, out_mask_sum))
}

impl codec::Encodable for RctType {
    fn encode(&self, s: &mut codec::Encoder) {
        s.append(&(*self as u8));
    }
}

impl codec::Decodable for RctType {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        match rlp.as_val::<u8>()? {
            0 => Ok(RctType::Null),
            3 => Ok(RctType::Bulletproof),
            _ => Err(codec::Error::InvalidValue("unknown RingCT type")),
        }
    }
}

impl codec::Encodable for CtKey {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list().append(&self.dest).append(&self.mask).end_list();
    }
}

impl codec::Decodable for CtKey {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let key = CtKey {
            dest: fields.next_val()?,
            mask: fields.next_val()?,
        };
        fields.finish()?;
        Ok(key)
    }
}

impl codec::Encodable for EcdhTuple {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list().append(&self.mask).append(&self.amount).end_list();
    }
}

impl codec::Decodable for EcdhTuple {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let tuple = EcdhTuple {
            mask: fields.next_val()?,
            amount: fields.next_val()?,
        };
        fields.finish()?;
        Ok(tuple)
    }
}

impl codec::Encodable for MgSig {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list().append(&self.ss).append(&self.cc).end_list();
    }
}

impl codec::Decodable for MgSig {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let mg = MgSig {
            ss: fields.next_val()?,
            cc: fields.next_val()?,
            ii: Vec::new(),
        };
        fields.finish()?;
        Ok(mg)
    }
}

impl codec::Encodable for RctSigBase {
    fn encode(&self, s: &mut codec::Encoder) {
        let masks: Vec<Key> = self.out_pk.iter().map(|pk| pk.mask).collect();
        s.begin_list();
        s.append(&self.rct_type);
        s.append_list(&self.ecdh_info);
        s.append_list(&masks);
        s.end_list();
    }
}

impl codec::Decodable for RctSigBase {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let rct_type = fields.next_val()?;
        let ecdh_info = fields.next_list()?;
        let masks: Vec<Key> = fields.next_list()?;
        fields.finish()?;
        Ok(RctSigBase {
            rct_type,
            message: Hash::zero(),
            mix_ring: Vec::new(),
            ecdh_info,
            out_pk: masks
                .into_iter()
                .map(|mask| CtKey {
                    dest: Key::default(),
                    mask,
                })
                .collect(),
        })
    }
}

impl codec::Encodable for RctSigPrunable {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list();
        s.append_list(&self.bulletproofs);
        s.append_list(&self.mgs);
        s.append_list(&self.pseudo_outs);
        s.end_list();
    }
}

impl codec::Decodable for RctSigPrunable {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let prunable = RctSigPrunable {
            bulletproofs: fields.next_list()?,
            mgs: fields.next_list()?,
            pseudo_outs: fields.next_list()?,
        };
        fields.finish()?;
        Ok(prunable)
    }
}

impl codec::Encodable for RctSig {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list().append(&self.base).append(&self.prunable).end_list();
    }
}

impl codec::Decodable for RctSig {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let rv = RctSig {
            base: fields.next_val()?,
            prunable: fields.next_val()?,
        };
        fields.finish()?;
        Ok(rv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::{ecc::Identity, KeyPair};

    struct Owned {
        keys: KeyPair,
        mask: Scalar,
        amount: u64,
    }

    impl Owned {
        fn new(amount: u64) -> Self {
            Owned {
                keys: KeyPair::generate(),
                mask: Scalar::random(&mut OsRng),
                amount,
            }
        }

        fn ct_key(&self) -> CtKey {
            CtKey {
                dest: Key::from(self.keys.public_key),
                mask: Key::from(commit(self.amount, &self.mask)),
            }
        }

        fn spend(&self, decoys: usize) -> InputSecret {
            let mut ring: Vec<CtKey> = (0..decoys).map(|_| Owned::new(7).ct_key()).collect();
            let real_index = decoys / 2;
            ring.insert(real_index, self.ct_key());
            InputSecret {
                ring,
                real_index,
                secret: self.keys.secret_key,
                mask: self.mask,
                amount: self.amount,
            }
        }
    }

    fn destination(amount: u64) -> Destination {
        Destination {
            key: Key::from(KeyPair::generate().public_key),
            amount,
            shared_secret: Scalar::random(&mut OsRng),
        }
    }

    fn sum(keys: &[Key]) -> Point {
        keys.iter()
            .map(|key| key.decompress().unwrap())
            .fold(Point::identity(), |acc, p| acc + p)
    }

    #[test]
    fn it_works() {
        let inputs = vec![Owned::new(60).spend(3), Owned::new(40).spend(3)];
        let dests = vec![destination(70), destination(25)];
        let (rv, _) = gen_rct_simple(keccak(b"prefix"), &inputs, &dests).unwrap();

        ver_rct_semantics_simple(&rv).unwrap();
        ver_rct_non_semantics_simple(&rv).unwrap();

        // 60 + 40 == 70 + 25 + fee of 5
        let masks: Vec<Key> = rv.base.out_pk.iter().map(|pk| pk.mask).collect();
        assert_eq!(
            sum(&rv.prunable.pseudo_outs),
            sum(&masks) + commit_to_amount(5)
        );
    }

    #[test]
    fn it_signs_single_member_rings() {
        let inputs = vec![Owned::new(10).spend(0)];
        let (rv, _) = gen_rct_simple(keccak(b"prefix"), &inputs, &[destination(10)]).unwrap();
        assert_eq!(rv.prunable.mgs[0].ss.rows(), 1);
        assert_eq!(rv.prunable.mgs[0].ss.cols(), 2);

        ver_rct_non_semantics_simple(&rv).unwrap();
    }

    #[test]
    fn it_binds_the_prefix_hash() {
        let inputs = vec![Owned::new(10).spend(2), Owned::new(5).spend(0)];
        let (mut rv, _) = gen_rct_simple(keccak(b"prefix"), &inputs, &[destination(15)]).unwrap();
        rv.base.message = keccak(b"another prefix");
        assert_eq!(
            ver_rct_non_semantics_simple(&rv),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn it_rejects_a_swapped_pseudo_out() {
        let inputs = vec![Owned::new(10).spend(2)];
        let (mut rv, _) = gen_rct_simple(keccak(b"prefix"), &inputs, &[destination(10)]).unwrap();
        rv.prunable.pseudo_outs[0] = Key::from(commit(10, &Scalar::random(&mut OsRng)));
        assert!(ver_rct_non_semantics_simple(&rv).is_err());
    }

    #[test]
    fn it_returns_the_output_mask_sum() {
        let dests = vec![destination(3), destination(4)];
        let (rv, mask_sum) = gen_rct_simple(keccak(b"prefix"), &[], &dests).unwrap();
        let masks: Vec<Key> = rv.base.out_pk.iter().map(|pk| pk.mask).collect();
        assert_eq!(sum(&masks), commit(7, &mask_sum));
        assert!(rv.prunable.mgs.is_empty());
        ver_rct_semantics_simple(&rv).unwrap();
    }

    #[test]
    fn it_checks_the_range_proof_shape() {
        let (mut rv, _) =
            gen_rct_simple(keccak(b"prefix"), &[], &[destination(1), destination(2)]).unwrap();
        for _ in 0..3 {
            rv.base.out_pk.push(rv.base.out_pk[0]);
            rv.base.ecdh_info.push(rv.base.ecdh_info[0]);
        }
        assert_eq!(
            ver_rct_semantics_simple(&rv),
            Err(Error::InvalidRangeProof(
                "Range proof does not cover every output"
            ))
        );

        let (mut rv, _) = gen_rct_simple(keccak(b"prefix"), &[], &[destination(1)]).unwrap();
        rv.prunable.bulletproofs.clear();
        assert!(ver_rct_semantics_simple(&rv).is_err());
    }

    #[test]
    fn it_decodes_ecdh_tuples() {
        let mask = Scalar::random(&mut OsRng);
        let secret = Scalar::random(&mut OsRng);
        let tuple = ecdh_encode(&mask, 123_456, &secret);
        assert_eq!(ecdh_decode(&tuple, &secret).unwrap(), (mask, 123_456));

        let other = Scalar::random(&mut OsRng);
        match ecdh_decode(&tuple, &other) {
            Ok((decoded, _)) => assert_ne!(decoded, mask),
            Err(e) => assert_eq!(e, Error::InvalidAmount),
        }
    }

    #[test]
    fn it_leaves_rebuilt_fields_off_the_wire() {
        let inputs = vec![Owned::new(9).spend(1)];
        let (rv, _) = gen_rct_simple(keccak(b"prefix"), &inputs, &[destination(9)]).unwrap();
        let decoded: RctSig = codec::decode(&codec::encode(&rv)).unwrap();

        assert!(decoded.base.mix_ring.is_empty());
        assert_eq!(decoded.base.message, Hash::zero());
        assert_eq!(decoded.base.out_pk[0].mask, rv.base.out_pk[0].mask);
        assert_eq!(decoded.base.out_pk[0].dest, Key::default());
        assert!(decoded.prunable.mgs[0].ii.is_empty());
        assert_eq!(decoded.prunable.pseudo_outs, rv.prunable.pseudo_outs);
        assert_eq!(codec::encode(&decoded), codec::encode(&rv));
    }
}
