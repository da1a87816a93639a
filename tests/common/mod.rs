#![allow(dead_code)]

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use shiftstack::constants::Image;
use shiftstack::{ImageStack, TimeSeries};

/// A synthetic point source moving linearly, rate in pixels per day.
#[derive(Debug, Clone, Copy)]
pub struct Mover {
    pub start: (f64, f64),
    pub rate: (f64, f64),
    pub flux: f64,
}

impl Mover {
    pub fn new(start: (f64, f64), rate: (f64, f64), flux: f64) -> Self {
        Self { start, rate, flux }
    }

    pub fn at(&self, elapsed: f64) -> (f64, f64) {
        (
            self.start.0 + self.rate.0 * elapsed,
            self.start.1 + self.rate.1 * elapsed,
        )
    }
}

/// Add a circular Gaussian of total `flux` centred at `center` to `image`.
pub fn add_gaussian(image: &mut Image, center: (f64, f64), sigma: f64, flux: f64) {
    let norm = flux / (2.0 * std::f64::consts::PI * sigma * sigma);
    for ((r, c), px) in image.indexed_iter_mut() {
        let dr = r as f64 - center.0;
        let dc = c as f64 - center.1;
        *px += norm * (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp();
    }
}

/// Frames of `shape` with the given movers and static stars.
///
/// Variance is flat at `noise_sigma²` (1 when `noise_sigma` is 0); with a
/// `seed`, Gaussian noise of that width is added to every pixel.
pub struct StackBuilder {
    pub shape: (usize, usize),
    pub elapsed: Vec<f64>,
    pub psf_sigma: f64,
    pub movers: Vec<Mover>,
    pub stars: Vec<((f64, f64), f64)>,
    pub noise_sigma: f64,
    pub seed: Option<u64>,
}

impl StackBuilder {
    pub fn new(shape: (usize, usize), num_frames: usize) -> Self {
        Self {
            shape,
            elapsed: (0..num_frames).map(|t| t as f64).collect(),
            psf_sigma: 1.0,
            movers: Vec::new(),
            stars: Vec::new(),
            noise_sigma: 0.0,
            seed: None,
        }
    }

    pub fn elapsed(mut self, elapsed: Vec<f64>) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn mover(mut self, mover: Mover) -> Self {
        self.movers.push(mover);
        self
    }

    pub fn star(mut self, center: (f64, f64), flux: f64) -> Self {
        self.stars.push((center, flux));
        self
    }

    pub fn noise(mut self, sigma: f64, seed: u64) -> Self {
        self.noise_sigma = sigma;
        self.seed = Some(seed);
        self
    }

    pub fn build(&self) -> ImageStack {
        let mut rng = self.seed.map(StdRng::seed_from_u64);
        let variance_value = if self.noise_sigma > 0.0 {
            self.noise_sigma * self.noise_sigma
        } else {
            1.0
        };

        let mut images = Vec::with_capacity(self.elapsed.len());
        for &t in &self.elapsed {
            let mut img = Array2::zeros(self.shape);
            for m in &self.movers {
                add_gaussian(&mut img, m.at(t), self.psf_sigma, m.flux);
            }
            for &(center, flux) in &self.stars {
                add_gaussian(&mut img, center, self.psf_sigma, flux);
            }
            if let (Some(rng), true) = (rng.as_mut(), self.noise_sigma > 0.0) {
                let normal = Normal::new(0.0, self.noise_sigma).unwrap();
                img.mapv_inplace(|v| v + rng.sample(normal));
            }
            images.push(img);
        }

        let variances = vec![Array2::from_elem(self.shape, variance_value); self.elapsed.len()];
        let times = TimeSeries::from_elapsed(self.elapsed.clone()).unwrap();
        ImageStack::new(images, variances, times).unwrap()
    }
}

pub fn distance(a: &nalgebra::Vector2<f64>, b: (f64, f64)) -> f64 {
    ((a.x - b.0).powi(2) + (a.y - b.1).powi(2)).sqrt()
}
