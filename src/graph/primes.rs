//! Odd-prime growth targets
//!
//! The search grows its graph to the next odd prime above the size of the
//! last counterexample before resuming.

pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest odd prime strictly greater than `n`.
pub fn next_odd_prime(n: usize) -> usize {
    let mut candidate = if n < 3 { 3 } else { n + 1 };
    if candidate % 2 == 0 {
        candidate += 1;
    }
    while !is_prime(candidate) {
        candidate += 2;
    }
    candidate
}

/// Lazy, unbounded sequence of odd primes.
#[derive(Debug, Clone)]
pub struct OddPrimes {
    last: usize,
}

impl OddPrimes {
    /// Sequence starting with the first odd prime above `n`.
    pub fn after(n: usize) -> Self {
        Self { last: n }
    }
}

impl Iterator for OddPrimes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.last = next_odd_prime(self.last);
        Some(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let primes: Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_next_odd_prime() {
        assert_eq!(next_odd_prime(0), 3);
        assert_eq!(next_odd_prime(2), 3);
        assert_eq!(next_odd_prime(3), 5);
        assert_eq!(next_odd_prime(32), 37);
        assert_eq!(next_odd_prime(36), 37);
        assert_eq!(next_odd_prime(37), 41);
        assert_eq!(next_odd_prime(100), 101);
    }

    #[test]
    fn test_odd_primes_sequence() {
        let seq: Vec<usize> = OddPrimes::after(30).take(5).collect();
        assert_eq!(seq, vec![31, 37, 41, 43, 47]);
    }
}
