#![feature(test)]

extern crate test;

use checksig::{miller_rabin, sieve_primes, BigUint, PrimeSearch};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

use test::Bencher;

const NUM: &'static str = "203956878356401977405765866929034577280193993314348263094772646453283062722701277632936616063144088173312372882677123879538709400158306567338328279154499698366071906766440037074217117805690872792848149112022286332144876183376326512083574821647933992961249917319836219304274280243803104015000563790123";

macro_rules! bench_miller_rabin {
    ($name:ident, $n:expr) => {
        #[bench]
        fn $name(b: &mut Bencher) {
            let x = test::black_box(BigUint::parse_bytes(NUM.as_bytes(), 10).unwrap());
            let mut rng = ChaCha8Rng::from_seed([42; 32]);

            b.iter(|| {
                let res = miller_rabin(&mut rng, &x, $n);
                test::black_box(res);
            });
        }
    };
}

bench_miller_rabin!(miller_rabin_1, 1);
bench_miller_rabin!(miller_rabin_5, 5);
bench_miller_rabin!(miller_rabin_10, 10);
bench_miller_rabin!(miller_rabin_20, 20);

#[bench]
fn bench_sieve_100000(b: &mut Bencher) {
    b.iter(|| {
        let count = sieve_primes(100_000).count();
        test::black_box(count);
    });
}

#[bench]
fn bench_prime_search_512(b: &mut Bencher) {
    let mut rng = ChaCha8Rng::from_seed([42; 32]);

    b.iter(|| {
        let p = PrimeSearch::new(512).run(&mut rng).unwrap();
        test::black_box(p);
    });
}
