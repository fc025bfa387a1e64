/// 人脸置信度下限，低于此值的人脸按未检测处理
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.7;

/// 每帧最多跟踪的人脸数
pub const MAX_TRACKED_FACES: usize = 1;

/// 从标准输入读取关键点回放
pub const STDIN_SOURCE: &str = "-";

/// 日志文件名前缀
pub const SERVICE_NAME: &str = "blink-monitor";
