//! Prime table sizing for the hash engines.

/// Smallest prime `>= x`, never below 3.
///
/// Open addressing derives its step as `1 + h % (m - 1)`, which needs
/// `m >= 3` prime so every step is coprime with `m`.
pub(crate) fn next_prime(x: usize) -> usize {
    if x <= 3 {
        return 3;
    }
    let mut n = if x % 2 == 0 { x + 1 } else { x };
    while !is_prime(n) {
        n += 2;
    }
    n
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}
