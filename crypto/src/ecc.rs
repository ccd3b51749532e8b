use crate::hash::{keccak, Hash};
use crate::{Error, Result};

pub use curve25519_dalek::constants::ED25519_BASEPOINT_POINT as BASEPOINT;
pub use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE as BASEPOINT_TABLE;
pub use curve25519_dalek::edwards::CompressedEdwardsY as CompressedPoint;
pub use curve25519_dalek::edwards::EdwardsBasepointTable as PointTable;
pub use curve25519_dalek::edwards::EdwardsPoint as Point;
pub use curve25519_dalek::scalar::Scalar;
pub use curve25519_dalek::traits::{Identity, IsIdentity, MultiscalarMul};

/// Compressed form of the second Pedersen generator `H`
const H_COMPRESSED: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf, 0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9, 0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

lazy_static! {
    /// Generator used for the amount half of a Pedersen commitment
    pub static ref H: Point = CompressedPoint(H_COMPRESSED)
        .decompress()
        .expect("H is a valid curve point");

    /// Precomputed multiples of `H`
    pub static ref H_TABLE: PointTable = PointTable::create(&H);

    /// Inverse of 8 modulo the group order
    pub static ref INV_EIGHT: Scalar = Scalar::from(8u8).invert();
}

fixed_bytes!(
    /// A compressed curve point or a scalar, as carried on the wire
    Key,
    32
);

impl Key {
    /// The compressed identity point
    pub fn identity() -> Self {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        Key(bytes)
    }

    /// Decompresses the key into a point
    pub fn decompress(&self) -> Result<Point> {
        CompressedPoint(self.0).decompress().ok_or(Error::InvalidPoint)
    }

    /// Reads the key as a scalar, reducing it modulo the group order
    pub fn to_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.0)
    }

    /// Reads the key as a scalar, rejecting unreduced encodings
    pub fn to_canonical_scalar(&self) -> Result<Scalar> {
        Scalar::from_canonical_bytes(self.0).ok_or(Error::InvalidScalar)
    }
}

impl From<Point> for Key {
    fn from(point: Point) -> Self {
        Key(point.compress().to_bytes())
    }
}

impl From<&Point> for Key {
    fn from(point: &Point) -> Self {
        Key(point.compress().to_bytes())
    }
}

impl From<Scalar> for Key {
    fn from(scalar: Scalar) -> Self {
        Key(scalar.to_bytes())
    }
}

impl From<Hash> for Key {
    fn from(hash: Hash) -> Self {
        Key(hash.0)
    }
}

/// Helper Extension Trait for Scalar
pub trait ScalarExt {
    /// Generates a Scalar from a 32 byte slice, reducing it
    ///
    /// Panics when `data` is not 32 bytes long.
    fn from_slice(data: &[u8]) -> Scalar {
        let mut scalar: [u8; 32] = [0; 32];
        scalar.copy_from_slice(data);
        Scalar::from_bytes_mod_order(scalar)
    }

    /// Interprets a digest as a scalar
    fn from_keccak_hash(hash: &Hash) -> Scalar {
        Scalar::from_bytes_mod_order(hash.0)
    }
}

impl ScalarExt for Scalar {}

/// `Hs`: hashes `data` and reduces the digest to a scalar
pub fn hash_to_scalar<T: AsRef<[u8]>>(data: T) -> Scalar {
    Scalar::from_keccak_hash(&keccak(data))
}

/// `Hp`: maps `data` to a point in the prime order subgroup
///
/// The digest is read as a compressed point; when it does not decompress it
/// is hashed again until it does. The result is multiplied by the cofactor.
pub fn hash_to_point<T: AsRef<[u8]>>(data: T) -> Point {
    let mut digest = keccak(data);
    loop {
        if let Some(point) = CompressedPoint(digest.0).decompress() {
            let point = point.mul_by_cofactor();
            if !point.is_identity() {
                return point;
            }
        }
        digest = keccak(digest);
    }
}

/// `x * Hp(P)` for the one-time key `P = xG`
pub fn key_image(secret: &Scalar, public: &Point) -> Point {
    secret * hash_to_point(public.compress().as_bytes())
}
