//! Aggregate range proofs
//!
//! A proof shows that each committed amount lies in `[0, 2^64)`. Up to
//! [`BULLETPROOF_MAX_OUTPUTS`](crate::BULLETPROOF_MAX_OUTPUTS) commitments
//! share one proof whose size grows with the logarithm of their number.
//! Every point in a proof is stored premultiplied by `1/8` and multiplied
//! back by the verifier, which clears any small order component.

// Needed because most cryptographic code relies on non snake case names
#![allow(non_snake_case)]

use ensure_macro::ensure;
use rand::rngs::OsRng;

use crypto::{
    ecc::{
        hash_to_point, hash_to_scalar, Identity, IsIdentity, MultiscalarMul, Point, Scalar,
        ScalarExt, BASEPOINT_TABLE, H, H_TABLE, INV_EIGHT,
    },
    Digest, Hash, Keccak256, Key,
};

use crate::{Error, Result, BULLETPROOF_MAX_OUTPUTS};

/// Aggregate range proof
///
/// `V` is not part of the wire form; verifiers rebuild it from the output
/// commitments as `commitment / 8`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bulletproof {
    pub V: Vec<Key>,
    pub A: Key,
    pub S: Key,
    pub T1: Key,
    pub T2: Key,
    pub taux: Key,
    pub mu: Key,
    pub L: Vec<Key>,
    pub R: Vec<Key>,
    pub a: Key,
    pub b: Key,
    pub t: Key,
}

/// Maximum number of bits `N` of the value
///
/// The input value is then proved to be within `[0,2^n]`
const N_BITS: usize = 64;
const LOG_N: usize = 6;

/// Maximum number of values proved by a given bulletproof
const M_MAX: usize = BULLETPROOF_MAX_OUTPUTS;
const LOG_M_MAX: usize = 4;

struct Transcript {
    hasher: Keccak256,
    value: Scalar,
}

impl Transcript {
    pub fn new(initial_value: Scalar) -> Transcript {
        let mut t = Transcript {
            hasher: Keccak256::new(),
            value: initial_value,
        };
        // Prefill the hasher with the current transcript value
        t.hasher.input(t.value.as_bytes());
        t
    }

    pub fn extend_with_keys(&mut self, keys: &[Key]) {
        keys.iter().for_each(|key| self.hasher.input(key.as_bytes()))
    }

    pub fn extend_with_scalars(&mut self, scalars: &[Scalar]) {
        scalars
            .iter()
            .for_each(|scalar| self.hasher.input(scalar.as_bytes()))
    }

    pub fn reset_state(&mut self, value: Scalar) {
        self.hasher.reset();
        self.value = value;
        self.hasher.input(self.value.as_bytes());
    }

    pub fn get_current_state(&mut self) -> Scalar {
        self.value = Scalar::from_keccak_hash(&Hash::from_hasher_reset(&mut self.hasher));
        self.hasher.input(self.value.as_bytes());
        self.value
    }
}

/// Generates a vector of powers of the given Scalar
///
/// `[1, a, a^2, ..., a^(n-1)]`
fn power_vector(a: Scalar, n: usize) -> Vec<Scalar> {
    let mut vec = Vec::with_capacity(n);
    let mut acc = Scalar::one();
    for _ in 0..n {
        vec.push(acc);
        acc *= a;
    }
    vec
}

/// Gets the sum of all powers of the given Scalar upto n
fn power_sum(a: Scalar, n: usize) -> Scalar {
    power_vector(a, n).iter().sum()
}

/// Computes the inner product of the given Scalar arrays
///
/// `IP = a_1*b_1 + a_2*b_2 + ... + a_n*b_n`
fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    let mut res = Scalar::zero();
    for (a, b) in a.iter().zip(b) {
        res += a * b;
    }
    res
}

fn get_power(base: &Point, index: u64) -> Point {
    let mut hasher = Keccak256::new();

    hasher.input(base.compress().as_bytes());
    hasher.input(b"bulletproof");
    hasher.input(codec::varint::serialize(index));

    hash_to_point(Hash::from_hasher(hasher))
}

struct Generators {
    Gi: Vec<Point>,
    Hi: Vec<Point>,
}

lazy_static! {
    /// Vector generators, even exponents for `Hi` and odd ones for `Gi`
    static ref GENERATORS: Generators = {
        let count = N_BITS * M_MAX;
        Generators {
            Gi: (0..count).map(|i| get_power(&H, 2 * i as u64 + 1)).collect(),
            Hi: (0..count).map(|i| get_power(&H, 2 * i as u64)).collect(),
        }
    };

    /// Power vector of the Scalar 2
    static ref TWO_POWERS: Vec<Scalar> = power_vector(Scalar::from(2u64), N_BITS);

    /// Inner product of the power vectors of 1 and 2
    static ref ONE_TWO_INNER_PRODUCT: Scalar = TWO_POWERS.iter().sum();
}

/// Smallest `logM` with `2^logM >= outputs`
fn log_outputs(outputs: usize) -> usize {
    let mut logM = 0;
    while (1 << logM) < outputs && (1 << logM) <= M_MAX {
        logM += 1;
    }
    logM
}

/// Number of `L` (and `R`) entries a proof over `outputs` values carries
pub fn rounds_for(outputs: usize) -> usize {
    LOG_N + log_outputs(outputs)
}

/// Proves that every `amounts[i]` committed with blinding `masks[i]` is a
/// 64 bit value
///
/// The returned `V[i]` equals `(masks[i] * G + amounts[i] * H) / 8`.
pub fn prove(amounts: &[u64], masks: &[Scalar]) -> Result<Bulletproof> {
    ensure!(
        !amounts.is_empty() && amounts.len() == masks.len(),
        Error::InconsistentParameters
    );
    ensure!(amounts.len() <= M_MAX, Error::TooManyOutputs);

    let logM = log_outputs(amounts.len());
    let M = 1 << logM;
    let MN = M * N_BITS;
    let Gi = &GENERATORS.Gi[..MN];
    let Hi = &GENERATORS.Hi[..MN];

    let V: Vec<Key> = amounts
        .iter()
        .zip(masks)
        .map(|(amount, gamma)| {
            let mask = gamma * *INV_EIGHT;
            let value = Scalar::from(*amount) * *INV_EIGHT;
            Key::from(&mask * &BASEPOINT_TABLE + &value * &*H_TABLE)
        })
        .collect();

    // Bit decomposition: aL holds the bits, aR = aL - 1
    let mut aL = vec![Scalar::zero(); MN];
    let mut aR = vec![Scalar::zero(); MN];
    for j in 0..M {
        for i in 0..N_BITS {
            if j < amounts.len() && (amounts[j] >> i) & 1 == 1 {
                aL[j * N_BITS + i] = Scalar::one();
            } else {
                aR[j * N_BITS + i] = -Scalar::one();
            }
        }
    }

    let mut hasher = Keccak256::new();
    V.iter().for_each(|v| hasher.input(v.as_bytes()));
    let hash_V = Scalar::from_keccak_hash(&Hash::from_hasher(hasher));

    // A zero challenge restarts the proof with fresh randomness
    'attempt: loop {
        let mut transcript = Transcript::new(hash_V);

        let alpha = Scalar::random(&mut OsRng);
        let A = (Point::multiscalar_mul(aL.iter().chain(&aR), Gi.iter().chain(Hi))
            + &alpha * &BASEPOINT_TABLE)
            * *INV_EIGHT;

        let sL: Vec<Scalar> = (0..MN).map(|_| Scalar::random(&mut OsRng)).collect();
        let sR: Vec<Scalar> = (0..MN).map(|_| Scalar::random(&mut OsRng)).collect();
        let rho = Scalar::random(&mut OsRng);
        let S = (Point::multiscalar_mul(sL.iter().chain(&sR), Gi.iter().chain(Hi))
            + &rho * &BASEPOINT_TABLE)
            * *INV_EIGHT;

        let (A, S) = (Key::from(A), Key::from(S));
        transcript.extend_with_keys(&[A, S]);
        let y = transcript.get_current_state();
        if y == Scalar::zero() {
            continue;
        }
        let z = hash_to_scalar(y.as_bytes());
        if z == Scalar::zero() {
            continue;
        }
        transcript.reset_state(z);

        // l(X) = l0 + l1 X and r(X) = r0 + r1 X
        let z_pow = power_vector(z, M + 2);
        let y_pow = power_vector(y, MN);
        let l0: Vec<Scalar> = aL.iter().map(|a| a - z).collect();
        let r0: Vec<Scalar> = (0..MN)
            .map(|i| (aR[i] + z) * y_pow[i] + z_pow[2 + i / N_BITS] * TWO_POWERS[i % N_BITS])
            .collect();
        let r1: Vec<Scalar> = sR.iter().zip(&y_pow).map(|(s, y)| s * y).collect();

        let t1 = inner_product(&l0, &r1) + inner_product(&sL, &r0);
        let t2 = inner_product(&sL, &r1);

        let tau1 = Scalar::random(&mut OsRng);
        let tau2 = Scalar::random(&mut OsRng);
        let T1 = Key::from((&t1 * &*H_TABLE + &tau1 * &BASEPOINT_TABLE) * *INV_EIGHT);
        let T2 = Key::from((&t2 * &*H_TABLE + &tau2 * &BASEPOINT_TABLE) * *INV_EIGHT);

        transcript.extend_with_scalars(&[z]);
        transcript.extend_with_keys(&[T1, T2]);
        let x = transcript.get_current_state();
        if x == Scalar::zero() {
            continue;
        }

        let mut taux = tau1 * x + tau2 * x * x;
        for (j, gamma) in masks.iter().enumerate() {
            taux += z_pow[j + 2] * gamma;
        }
        let mu = x * rho + alpha;

        let l: Vec<Scalar> = l0.iter().zip(&sL).map(|(l0, l1)| l0 + l1 * x).collect();
        let r: Vec<Scalar> = r0.iter().zip(&r1).map(|(r0, r1)| r0 + r1 * x).collect();
        let t = inner_product(&l, &r);

        transcript.extend_with_scalars(&[x, taux, mu, t]);
        let x_ip = transcript.get_current_state();
        if x_ip == Scalar::zero() {
            continue;
        }

        // Inner product argument, halving the vectors every round
        let y_inv_pow = power_vector(y.invert(), MN);
        let mut Gp: Vec<Point> = Gi.to_vec();
        let mut Hp: Vec<Point> = Hi.iter().zip(&y_inv_pow).map(|(h, s)| s * h).collect();
        let mut ap = l;
        let mut bp = r;
        let mut L = Vec::with_capacity(LOG_N + logM);
        let mut R = Vec::with_capacity(LOG_N + logM);

        let mut n = MN;
        while n > 1 {
            n /= 2;
            let cL = inner_product(&ap[..n], &bp[n..]);
            let cR = inner_product(&ap[n..], &bp[..n]);

            let L_i = Point::multiscalar_mul(
                ap[..n].iter().chain(&bp[n..]).chain(Some(&(cL * x_ip))),
                Gp[n..].iter().chain(&Hp[..n]).chain(Some(&*H)),
            ) * *INV_EIGHT;
            let R_i = Point::multiscalar_mul(
                ap[n..].iter().chain(&bp[..n]).chain(Some(&(cR * x_ip))),
                Gp[..n].iter().chain(&Hp[n..]).chain(Some(&*H)),
            ) * *INV_EIGHT;
            let (L_i, R_i) = (Key::from(L_i), Key::from(R_i));

            transcript.extend_with_keys(&[L_i, R_i]);
            let w = transcript.get_current_state();
            if w == Scalar::zero() {
                continue 'attempt;
            }
            let w_inv = w.invert();
            L.push(L_i);
            R.push(R_i);

            for i in 0..n {
                Gp[i] = w_inv * Gp[i] + w * Gp[n + i];
                Hp[i] = w * Hp[i] + w_inv * Hp[n + i];
                ap[i] = w * ap[i] + w_inv * ap[n + i];
                bp[i] = w_inv * bp[i] + w * bp[n + i];
            }
            Gp.truncate(n);
            Hp.truncate(n);
            ap.truncate(n);
            bp.truncate(n);
        }

        return Ok(Bulletproof {
            V,
            A,
            S,
            T1,
            T2,
            taux: Key::from(taux),
            mu: Key::from(mu),
            L,
            R,
            a: Key::from(ap[0]),
            b: Key::from(bp[0]),
            t: Key::from(t),
        });
    }
}

/// Checks a single proof
pub fn verify(proof: &Bulletproof) -> Result<()> {
    verify_multiple(&[proof])
}

fn canonical(key: &Key) -> Result<Scalar> {
    key.to_canonical_scalar()
        .map_err(|_| Error::InvalidRangeProof("Input scalars not in range"))
}

/// Checks a set of bulletproofs for validity
///
/// All proofs are folded into two multi-exponentiations with random weights.
pub fn verify_multiple(proofs: &[&Bulletproof]) -> Result<()> {
    let mut max_length = 0;
    for proof in proofs {
        ensure!(!proof.L.is_empty(), Error::InvalidRangeProof("Proof is empty"));
        ensure!(
            !proof.V.is_empty(),
            Error::InvalidRangeProof("Proof does not have at least one commitment V")
        );
        ensure!(proof.V.len() <= M_MAX, Error::TooManyOutputs);
        ensure!(
            proof.L.len() == proof.R.len(),
            Error::InvalidRangeProof("Proof does not have L.len() == R.len()")
        );
        max_length = std::cmp::max(max_length, proof.L.len());
    }
    ensure!(
        max_length <= LOG_N + LOG_M_MAX,
        Error::InvalidRangeProof("At least one proof is too large")
    );

    let maxMN = 1usize << max_length;

    // Setup weighted aggregates
    let mut Z0 = Point::identity();
    let mut z1 = Scalar::zero();
    let mut Z2 = Point::identity();
    let mut z3 = Scalar::zero();
    let mut z4 = vec![Scalar::zero(); maxMN];
    let mut z5 = vec![Scalar::zero(); maxMN];
    let mut Y2 = Point::identity();
    let mut Y3 = Point::identity();
    let mut Y4 = Point::identity();
    let mut y0 = Scalar::zero();
    let mut y1 = Scalar::zero();

    for proof in proofs {
        let tau_x = canonical(&proof.taux)?;
        let mu = canonical(&proof.mu)?;
        let a = canonical(&proof.a)?;
        let b = canonical(&proof.b)?;
        let t = canonical(&proof.t)?;

        let logM = log_outputs(proof.V.len());
        let M = 1 << logM;
        ensure!(
            proof.L.len() == LOG_N + logM,
            Error::InvalidRangeProof("Proof does not have the expected size")
        );

        let MN = N_BITS * M;

        let weight = Scalar::random(&mut OsRng);

        // Replay the transcript
        let mut hasher = Keccak256::new();
        proof.V.iter().for_each(|v| hasher.input(v.as_bytes()));

        let mut transcript = Transcript::new(Scalar::from_keccak_hash(&Hash::from_hasher(hasher)));

        // Challenge y
        transcript.extend_with_keys(&[proof.A, proof.S]);
        let y = transcript.get_current_state();
        ensure!(y != Scalar::zero(), Error::InvalidRangeProof("y == 0"));

        // Challenge z
        let z = hash_to_scalar(y.as_bytes());
        ensure!(z != Scalar::zero(), Error::InvalidRangeProof("z == 0"));
        transcript.reset_state(z);

        transcript.extend_with_scalars(&[z]);
        transcript.extend_with_keys(&[proof.T1, proof.T2]);

        let x = transcript.get_current_state();
        ensure!(x != Scalar::zero(), Error::InvalidRangeProof("x == 0"));

        transcript.extend_with_scalars(&[x, tau_x, mu, t]);
        let x_ip = transcript.get_current_state();
        ensure!(x_ip != Scalar::zero(), Error::InvalidRangeProof("x_ip == 0"));

        // Multiply some points to account for cofactor-8
        let eight = |key: &Key| key.decompress().map(|p| p.mul_by_cofactor());
        let V = proof.V.iter().map(eight).collect::<crypto::Result<Vec<_>>>()?;
        let L = proof.L.iter().map(eight).collect::<crypto::Result<Vec<_>>>()?;
        let R = proof.R.iter().map(eight).collect::<crypto::Result<Vec<_>>>()?;
        let T_1 = eight(&proof.T1)?;
        let T_2 = eight(&proof.T2)?;
        let A = eight(&proof.A)?;
        let S = eight(&proof.S)?;

        y0 += weight * tau_x;

        let z_pow = power_vector(z, M + 3);

        let ip1y = power_sum(y, MN);
        let mut k = -(z_pow[2] * ip1y);
        for j in 1..=M {
            k -= z_pow[j + 2] * *ONE_TWO_INNER_PRODUCT;
        }

        y1 += weight * (t - (k + (z * ip1y)));
        Y2 += weight * Point::multiscalar_mul(&z_pow[2..(2 + V.len())], &V);

        Y3 += (weight * x) * T_1;
        Y4 += (weight * (x * x)) * T_2;

        Z0 += weight * (A + (x * S));

        // log(64) (= 6) + log(M)
        let rounds = LOG_N + logM;
        let w = (0..rounds)
            .map(|i| {
                transcript.extend_with_keys(&[proof.L[i], proof.R[i]]);
                transcript.get_current_state()
            })
            .collect::<Vec<_>>();
        ensure!(
            w.iter().all(|w_i| *w_i != Scalar::zero()),
            Error::InvalidRangeProof("w[i] == 0")
        );

        let mut y_pow = Scalar::one();
        let y_inv = y.invert();
        let mut y_inv_pow = Scalar::one();
        let w_inv = w.iter().map(|w_i| w_i.invert()).collect::<Vec<_>>();

        for i in 0..MN {
            let mut g = a;
            let mut h = b * y_inv_pow;

            for j in (0..rounds).rev() {
                let J = w.len() - j - 1;

                if (i & (1 << j)) == 0 {
                    g *= w_inv[J];
                    h *= w[J];
                } else {
                    g *= w[J];
                    h *= w_inv[J];
                }
            }

            g += z;

            let mut tmp = z_pow[2 + (i / N_BITS)] * TWO_POWERS[i % N_BITS];
            tmp += z * y_pow;
            h -= tmp * y_inv_pow;

            z4[i] += weight * g;
            z5[i] += weight * h;

            y_inv_pow *= y_inv;
            y_pow *= y;
        }

        z1 += weight * mu;

        let acc = Point::multiscalar_mul(
            (0..2 * rounds).map(|i| {
                let w_i = if i % 2 == 0 { w[i / 2] } else { w_inv[i / 2] };
                w_i * w_i
            }),
            (0..2 * rounds).map(|i| if i % 2 == 0 { L[i / 2] } else { R[i / 2] }),
        );

        Z2 += weight * acc;
        z3 += weight * (x_ip * (t - (a * b)));
    }

    let check1 = (&y0 * &BASEPOINT_TABLE) + (&y1 * &*H_TABLE) - Y2 - Y3 - Y4;
    ensure!(check1.is_identity(), Error::InvalidRangeProof("Check 1 failed"));

    let p = Point::multiscalar_mul(
        z4.iter().chain(&z5).map(|s| -s),
        GENERATORS.Gi[..maxMN].iter().chain(&GENERATORS.Hi[..maxMN]),
    );

    let check2 = (&z3 * &*H_TABLE) - (&z1 * &BASEPOINT_TABLE) + Z0 + Z2 + p;
    ensure!(check2.is_identity(), Error::InvalidRangeProof("Check 2 failed"));

    Ok(())
}

impl codec::Encodable for Bulletproof {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list();
        s.append(&self.A).append(&self.S).append(&self.T1).append(&self.T2);
        s.append(&self.taux).append(&self.mu);
        s.append_list(&self.L).append_list(&self.R);
        s.append(&self.a).append(&self.b).append(&self.t);
        s.end_list();
    }
}

impl codec::Decodable for Bulletproof {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let proof = Bulletproof {
            V: Vec::new(),
            A: fields.next_val()?,
            S: fields.next_val()?,
            T1: fields.next_val()?,
            T2: fields.next_val()?,
            taux: fields.next_val()?,
            mu: fields.next_val()?,
            L: fields.next_list()?,
            R: fields.next_list()?,
            a: fields.next_val()?,
            b: fields.next_val()?,
            t: fields.next_val()?,
        };
        fields.finish()?;
        Ok(proof)
    }
}
