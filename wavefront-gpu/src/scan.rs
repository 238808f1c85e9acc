/// Exclusive Blelloch scan (up-sweep followed by down-sweep), performed in
/// place; returns the total.
///
/// This is the host twin of `scan_sums` from `sort.wgsl`, where each level of
/// the tree is processed by one workgroup in parallel.
///
/// `data.len()` must be a power of two (or zero).
pub fn blelloch_scan(data: &mut [u32]) -> u32 {
    let len = data.len();

    if len == 0 {
        return 0;
    }

    assert!(len.is_power_of_two(), "scan length must be a power of two");

    // Up-sweep (reduce)
    let mut offset = 1;

    while offset < len {
        for i in (0..len).step_by(offset * 2) {
            data[i + offset * 2 - 1] += data[i + offset - 1];
        }

        offset *= 2;
    }

    let total = data[len - 1];

    data[len - 1] = 0;

    // Down-sweep
    while offset > 1 {
        offset /= 2;

        for i in (0..len).step_by(offset * 2) {
            let left = i + offset - 1;
            let right = i + offset * 2 - 1;
            let tmp = data[left];

            data[left] = data[right];
            data[right] += tmp;
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_scan(data: &[u32]) -> (Vec<u32>, u32) {
        let mut sum = 0;

        let scanned = data
            .iter()
            .map(|value| {
                let prev = sum;
                sum += value;
                prev
            })
            .collect();

        (scanned, sum)
    }

    #[test]
    fn matches_sequential_scan() {
        let mut noise = crate::Noise::new(42, 0);

        for len in [1, 2, 4, 64, 512, 2048] {
            let data: Vec<u32> =
                (0..len).map(|_| noise.sample_int() % 100).collect();

            let (expected, expected_total) = sequential_scan(&data);

            let mut actual = data.clone();
            let actual_total = blelloch_scan(&mut actual);

            assert_eq!(expected, actual, "len={len}");
            assert_eq!(expected_total, actual_total, "len={len}");
        }
    }

    #[test]
    fn small() {
        let mut data = [3, 1, 7, 0, 4, 1, 6, 3];

        assert_eq!(25, blelloch_scan(&mut data));
        assert_eq!([0, 3, 4, 11, 11, 15, 16, 22], data);
    }

    #[test]
    fn empty() {
        assert_eq!(0, blelloch_scan(&mut []));
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two() {
        blelloch_scan(&mut [1, 2, 3]);
    }
}
