use rand::Rng;

/// Generate a human-readable order code: four random 5-digit groups joined
/// by hyphens, e.g. `48213-90417-11236-55902`. Uniqueness is not checked;
/// the code is a customer-facing reference, not a primary key.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let group = |rng: &mut rand::rngs::ThreadRng| rng.gen_range(10_000..=99_999);
    format!("{}-{}-{}-{}", group(&mut rng), group(&mut rng), group(&mut rng), group(&mut rng))
}

#[cfg(test)]
mod tests {
    use super::generate;

    #[test]
    fn code_has_four_five_digit_groups() {
        for _ in 0..32 {
            let code = generate();
            let groups: Vec<&str> = code.split('-').collect();
            assert_eq!(groups.len(), 4, "code {code} should have four groups");
            for group in groups {
                assert_eq!(group.len(), 5);
                let value: u32 = group.parse().expect("numeric group");
                assert!((10_000..=99_999).contains(&value));
            }
        }
    }
}
