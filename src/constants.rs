/// 每秒毫秒数
pub const MILLIS_PER_SECOND: i64 = 1_000;

/// 每分钟毫秒数
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Face mesh 模型输出的最少关键点数量
pub const FACE_MESH_MIN_POINTS: usize = 468;

/// 默认 EAR 闭眼阈值
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;

/// 默认连续低于阈值的帧数要求
pub const DEFAULT_CONSECUTIVE_FRAMES: u32 = 2;

/// 默认眨眼去抖间隔（毫秒）
pub const DEFAULT_DEBOUNCE_MS: f64 = 100.0;

/// 人类眨眼频率的合理上限（次/分钟），超过视为噪声
pub const MAX_PLAUSIBLE_BLINK_RATE: f64 = 60.0;

/// 疲劳提醒通知的去重标签
pub const FATIGUE_NOTIFICATION_TAG: &str = "fatigue-alert";
