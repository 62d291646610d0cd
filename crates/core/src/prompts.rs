use rand::seq::IndexedRandom;

/// Example prompts offered to new users.
pub const EXAMPLE_PROMPTS: &[&str] = &[
    "a beautiful landscape, anime style, high quality",
    "a cute cat, sitting on a windowsill, detailed fur",
    "a futuristic city, cyberpunk style, neon lights",
    "a serene mountain lake, sunset, reflection",
    "a portrait of a young woman, renaissance style",
];

/// Pick one example prompt at random.
pub fn random_example_prompt() -> &'static str {
    EXAMPLE_PROMPTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(EXAMPLE_PROMPTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_prompt_comes_from_the_list() {
        let prompt = random_example_prompt();
        assert!(EXAMPLE_PROMPTS.contains(&prompt));
    }
}
