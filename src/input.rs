use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Anything that can report whether a control letter is held this frame.
pub trait InputSource {
    fn is_pressed(&self, key: char) -> bool;
}

/// Held-key snapshot fed by whatever owns the real keyboard.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<char>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: char) {
        self.held.insert(key.to_ascii_uppercase());
    }

    pub fn release(&mut self, key: char) {
        self.held.remove(&key.to_ascii_uppercase());
    }
}

impl InputSource for KeyboardState {
    fn is_pressed(&self, key: char) -> bool {
        self.held.contains(&key.to_ascii_uppercase())
    }
}

/// Headless driver: every frame each letter is held with probability `throttle`.
#[derive(Debug, Clone)]
pub struct Autopilot {
    throttle: f64,
    held: HashSet<char>,
}

impl Autopilot {
    /// Non-finite throttles never press.
    pub fn new(throttle: f64) -> Self {
        let throttle = if throttle.is_finite() { throttle.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            throttle,
            held: HashSet::new(),
        }
    }

    /// Decide which of `keys` are held for the coming frame.
    pub fn roll(&mut self, keys: impl IntoIterator<Item = char>, rng: &mut impl Rng) {
        self.held = keys
            .into_iter()
            .filter(|_| rng.gen_bool(self.throttle))
            .collect();
    }
}

impl InputSource for Autopilot {
    fn is_pressed(&self, key: char) -> bool {
        self.held.contains(&key)
    }
}

/// Letters not yet assigned to a car.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterPool {
    available: Vec<char>,
}

impl LetterPool {
    pub fn new() -> Self {
        Self {
            available: ALPHABET.chars().collect(),
        }
    }

    /// Remove and return a random letter, or `None` once all 26 are taken.
    pub fn draw(&mut self, rng: &mut impl Rng) -> Option<char> {
        let letter = *self.available.choose(rng)?;
        self.available.retain(|&c| c != letter);
        Some(letter)
    }

    /// Give a letter back. Returns false for letters already in the pool or
    /// outside the alphabet.
    pub fn release(&mut self, letter: char) -> bool {
        if !ALPHABET.contains(letter) || self.available.contains(&letter) {
            return false;
        }
        self.available.push(letter);
        true
    }

    pub fn contains(&self, letter: char) -> bool {
        self.available.contains(&letter)
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl Default for LetterPool {
    fn default() -> Self {
        Self::new()
    }
}
