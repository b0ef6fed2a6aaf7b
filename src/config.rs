//! 定义了时间轮与流水线的可配置参数。
//! Defines configurable parameters for the timing wheel and the pipeline.

use std::time::Duration;

/// Configuration for a hierarchical timing wheel.
///
/// 分层时间轮的配置。
#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// The real-time duration of one tick. Every tick rotates the finest
    /// wheel level by one bucket.
    /// 一个 tick 对应的真实时长。每个 tick 将最细粒度的轮转动一个桶。
    pub tick_interval: Duration,

    /// The number of buckets per wheel level.
    /// 每层时间轮的桶数量。
    pub buckets_per_wheel: usize,

    /// The longest delay the hierarchy must be able to represent. The
    /// number of wheel levels is derived from this; delays beyond it are
    /// silently clamped.
    ///
    /// 层级结构必须能够表示的最长延迟。时间轮的层数由它推导；
    /// 超出它的延迟会被静默截断。
    pub max_timeout: Duration,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            buckets_per_wheel: 100,
            max_timeout: Duration::from_secs(60),
        }
    }
}

impl WheelConfig {
    /// Validates the configuration. Misconfiguration is a programmer
    /// error, so violations abort construction instead of returning a
    /// recoverable error.
    ///
    /// 校验配置。错误配置属于编程错误，因此违例会中止构造，
    /// 而不是返回可恢复的错误。
    pub fn validate(&self) {
        assert!(
            self.tick_interval > Duration::ZERO,
            "tick_interval must be positive"
        );
        assert!(
            self.buckets_per_wheel > 1,
            "buckets_per_wheel must be greater than 1"
        );
        assert!(
            self.max_timeout > self.tick_interval,
            "max_timeout must exceed tick_interval"
        );
    }

    /// The total delay, in ticks, the hierarchy must cover.
    /// 层级结构必须覆盖的总延迟（以 tick 为单位）。
    pub fn max_ticks(&self) -> u64 {
        self.max_timeout.as_nanos().div_ceil(self.tick_interval.as_nanos()) as u64
    }

    /// Computes the minimal number of wheel levels such that
    /// `buckets_per_wheel^levels >= max_ticks`.
    /// 计算满足 `buckets_per_wheel^levels >= max_ticks` 的最小层数。
    pub fn levels(&self) -> usize {
        let buckets = self.buckets_per_wheel as u64;
        let max_ticks = self.max_ticks();
        let mut levels = 1usize;
        let mut capacity = buckets;
        while capacity < max_ticks {
            capacity = capacity.saturating_mul(buckets);
            levels += 1;
        }
        levels
    }

    /// Converts a delay into a whole number of ticks, rounding up.
    /// 将延迟向上取整换算为 tick 数。
    pub fn delay_to_ticks(&self, delay: Duration) -> u64 {
        delay.as_nanos().div_ceil(self.tick_interval.as_nanos()) as u64
    }
}

/// Configuration for a per-connection response pipeline.
///
/// 每连接响应流水线的配置。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The depth of the pipeline actor's command channel.
    /// 流水线 actor 命令通道的深度。
    pub command_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { command_buffer: 128 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wheel_config_is_valid() {
        let config = WheelConfig::default();
        config.validate();
        assert_eq!(config.max_ticks(), 60);
        // 60 ticks fit within a single 100-bucket wheel
        assert_eq!(config.levels(), 1);
    }

    #[test]
    fn levels_grow_with_max_timeout() {
        let config = WheelConfig {
            tick_interval: Duration::from_secs(1),
            buckets_per_wheel: 10,
            max_timeout: Duration::from_secs(1000),
        };
        config.validate();
        assert_eq!(config.levels(), 3);

        let config = WheelConfig {
            tick_interval: Duration::from_secs(1),
            buckets_per_wheel: 10,
            max_timeout: Duration::from_secs(100),
        };
        assert_eq!(config.levels(), 2);
    }

    #[test]
    fn delay_to_ticks_rounds_up() {
        let config = WheelConfig::default();
        assert_eq!(config.delay_to_ticks(Duration::from_millis(1)), 1);
        assert_eq!(config.delay_to_ticks(Duration::from_millis(1000)), 1);
        assert_eq!(config.delay_to_ticks(Duration::from_millis(1001)), 2);
        assert_eq!(config.delay_to_ticks(Duration::ZERO), 0);
    }

    #[test]
    #[should_panic(expected = "buckets_per_wheel must be greater than 1")]
    fn single_bucket_wheel_rejected() {
        WheelConfig {
            tick_interval: Duration::from_secs(1),
            buckets_per_wheel: 1,
            max_timeout: Duration::from_secs(60),
        }
        .validate();
    }
}
