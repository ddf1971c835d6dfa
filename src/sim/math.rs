//! Seeded randomness, hashing and animation curves

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Deterministic RNG for a numeric seed
#[inline]
pub fn seeded_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Deterministic RNG for an address (same address, same stream)
#[inline]
pub fn address_rng(address: &str, salt: u32) -> Pcg32 {
    seeded_rng(((hash_str(address) as u64) << 32) | salt as u64)
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes, with explicit wraparound
pub fn hash_str(s: &str) -> u32 {
    s.bytes().fold(FNV_OFFSET, |h, b| (h ^ b as u32).wrapping_mul(FNV_PRIME))
}

/// Hash mapped to an angle in [0, 2π)
#[inline]
pub fn hash_angle(s: &str) -> f32 {
    (hash_str(s) as f64 / (u32::MAX as f64 + 1.0) * std::f64::consts::TAU) as f32
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}

/// Overshoot constant for back-out easing
pub const BACK_OVERSHOOT: f32 = 1.70158;

/// Back-out easing: overshoots past 1 then settles
#[inline]
pub fn ease_out_back(t: f32) -> f32 {
    let c1 = BACK_OVERSHOOT;
    let c3 = c1 + 1.0;
    let u = t.clamp(0.0, 1.0) - 1.0;
    1.0 + c3 * u.powi(3) + c1 * u.powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_hash_is_fnv1a() {
        assert_eq!(hash_str(""), 0x811c_9dc5);
        assert_eq!(hash_str("a"), 0xe40c_292c);
        assert_eq!(hash_str("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let mut a = seeded_rng(42);
        let mut b = seeded_rng(42);
        for _ in 0..16 {
            let x: f32 = a.random();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x, b.random::<f32>());
        }
    }

    #[test]
    fn test_easing_endpoints() {
        for f in [ease_in_out_cubic, ease_out_cubic, ease_out_back] {
            assert!(f(0.0).abs() < 1e-6);
            assert!((f(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_back_out_overshoots() {
        let peak = (1..100)
            .map(|i| ease_out_back(i as f32 / 100.0))
            .fold(0.0f32, f32::max);
        assert!(peak > 1.05 && peak < 1.15);
    }

    #[test]
    fn test_hash_angle_range() {
        for s in ["a", "b", "0xdeadbeef", "placeholder_sprite"] {
            let a = hash_angle(s);
            assert!((0.0..std::f32::consts::TAU).contains(&a));
        }
    }
}
