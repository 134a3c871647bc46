// config.rs

use std::str::FromStr;

/// Problem sizes and tolerances for one sample run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Number of logical elements (one `Float4` pair per element).
    pub num_elements: usize,
    pub local_work_size: usize,
    /// Host threads used for the reference calculation.
    pub num_threads: usize,
    /// Inner loop count of the heavy calculation kernel.
    pub inner_iterations: u32,
    pub epsilon: f32,
}

impl RunConfig {
    pub fn dot_product() -> Self {
        Self {
            num_elements: 1_277_944,
            local_work_size: 256,
            num_threads: 1,
            inner_iterations: 0,
            epsilon: 0.0,
        }
    }

    pub fn heavy_calculation() -> Self {
        Self {
            num_elements: 1_000_000,
            local_work_size: 256,
            num_threads: 24,
            inner_iterations: 0,
            epsilon: 0.0,
        }
    }

    /// Applies `DOTPROD_*` environment overrides. Values that fail to parse are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("DOTPROD_NUM_ELEMENTS", &mut self.num_elements);
        override_from_env("DOTPROD_LOCAL_WORK_SIZE", &mut self.local_work_size);
        override_from_env("DOTPROD_NUM_THREADS", &mut self.num_threads);
        override_from_env("DOTPROD_INNER_ITERATIONS", &mut self.inner_iterations);
        override_from_env("DOTPROD_EPSILON", &mut self.epsilon);
        self
    }

    pub fn global_work_size(&self) -> usize {
        round_up(self.local_work_size, self.num_elements)
    }

    pub fn work_groups(&self) -> usize {
        self.global_work_size() / self.local_work_size
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.num_elements == 0 {
            return Err("num_elements must be greater than zero".to_string());
        }
        if self.local_work_size == 0 {
            return Err("local_work_size must be greater than zero".to_string());
        }
        if self.num_threads == 0 {
            return Err("num_threads must be greater than zero".to_string());
        }
        if self.num_elements > u32::MAX as usize {
            return Err(format!("num_elements {} does not fit in u32", self.num_elements));
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(format!("epsilon must be a non-negative number, got {}", self.epsilon));
        }
        Ok(())
    }
}

/// Rounds `n` up to the nearest multiple of `group`.
pub fn round_up(group: usize, n: usize) -> usize {
    let r = n % group;
    if r == 0 {
        n
    } else {
        n + group - r
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            log::debug!("{key} overridden to {raw}");
            *target = value;
        }
        Err(_) => log::warn!("Ignoring {key}={raw}: not a valid value"),
    }
}
