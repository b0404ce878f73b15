use rand::seq::SliceRandom;
use rand::Rng;

use crate::bucket::BucketMap;
use crate::probe::ProbeId;

/// Draw one id uniformly from every occupied bucket, in bucket key order.
pub fn sample<R: Rng + ?Sized>(buckets: &BucketMap, rng: &mut R) -> Vec<ProbeId> {
    buckets
        .values()
        .filter_map(|ids| ids.choose(&mut *rng).copied())
        .collect()
}
