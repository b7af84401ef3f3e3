//! Logging service and logger sinks

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use crate::utils::Span;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Simple logger trait
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Main logging service with configuration awareness
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Check if an event passes the filter. Halting errors at or above the
    /// security level are never filtered out.
    pub fn should_log(&self, event: &LogEvent) -> bool {
        event.level <= self.min_level
            || (event.requires_halt() && event.level <= config::get_security_log_level())
    }

    /// Log an event
    pub fn log_event(&self, mut event: LogEvent) {
        if !self.should_log(&event) {
            return;
        }

        let clamped = config::clamp_message(&event.message);
        if clamped.len() < event.message.len() {
            event.message = clamped.to_string();
        }
        self.logger.log(&event);
    }

    pub fn log_error(&self, error_code: Code, message: &str) {
        self.log_event(LogEvent::error(error_code, message));
    }

    pub fn log_error_with_span(&self, error_code: Code, message: &str, span: Span) {
        self.log_event(LogEvent::error(error_code, message).with_span(span));
    }

    pub fn log_success(&self, success_code: Code, message: &str) {
        self.log_event(LogEvent::success(success_code, message));
    }

    pub fn log_info(&self, message: &str) {
        self.log_event(LogEvent::info(message));
    }

    pub fn log_warning_with_code(&self, warning_code: Code, message: &str) {
        self.log_event(LogEvent::warning_with_code(warning_code, message));
    }

    pub fn log_debug(&self, message: &str) {
        self.log_event(LogEvent::debug(message));
    }
}

/// Human-readable console logger; errors go to stderr
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= self.min_level || event.requires_halt() {
            match event.level {
                LogLevel::Error => eprintln!("{}", event.format()),
                _ => println!("{}", event.format()),
            }
        }
    }
}

/// JSON-lines logger for tooling integration
pub struct StructuredLogger {
    min_level: LogLevel,
}

impl StructuredLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= self.min_level || event.requires_halt() {
            let output = event.format_json().unwrap_or_else(|_| event.format());
            eprintln!("{}", output);
        }
    }
}

/// Bounded in-memory logger, mostly for tests and diagnostics
pub struct MemoryLogger {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::with_capacity(config::get_log_buffer_size())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_events(&self) -> Vec<LogEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    pub fn get_errors(&self) -> Vec<LogEvent> {
        self.lock().iter().filter(|e| e.is_error()).cloned().collect()
    }

    pub fn get_events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }

    pub fn has_error_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_error() && e.code == code)
    }

    pub fn has_success_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|e| e.is_info() && e.code == code)
    }

    pub fn get_summary(&self) -> EventSummary {
        let events = self.lock();
        let mut summary = EventSummary::default();

        for event in events.iter() {
            summary.total_events += 1;
            match event.level {
                LogLevel::Error => {
                    summary.error_count += 1;
                    if event.requires_halt() {
                        summary.critical_count += 1;
                    }
                }
                LogLevel::Warning => summary.warning_count += 1,
                LogLevel::Info => summary.info_count += 1,
                LogLevel::Debug => summary.debug_count += 1,
            }
        }

        summary
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Counts of logged events by level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSummary {
    pub total_events: usize,
    pub error_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub debug_count: usize,
}

impl EventSummary {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_critical_errors(&self) -> bool {
        self.critical_count > 0
    }
}

/// Fan-out logger; with no sinks attached it discards everything
pub struct MultiLogger {
    loggers: Vec<Arc<dyn Logger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    pub fn add_logger(&mut self, logger: Arc<dyn Logger>) {
        self.loggers.push(logger);
    }

    pub fn with_console(mut self, console_level: LogLevel) -> Self {
        self.add_logger(Arc::new(ConsoleLogger::new(console_level)));
        self
    }

    pub fn with_structured_console(mut self, console_level: LogLevel) -> Self {
        self.add_logger(Arc::new(StructuredLogger::new(console_level)));
        self
    }

    pub fn with_memory(mut self) -> (Self, Arc<MemoryLogger>) {
        let memory = Arc::new(MemoryLogger::new());
        self.add_logger(memory.clone());
        (self, memory)
    }
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MultiLogger {
    fn log(&self, event: &LogEvent) {
        for logger in &self.loggers {
            logger.log(event);
        }
    }
}

/// Build the service described by the runtime logging preferences
pub fn create_configured_service() -> LoggingService {
    let min_level = config::get_min_log_level();
    let mut sinks = MultiLogger::new();

    if config::use_structured_logging() {
        sinks = sinks.with_structured_console(min_level);
    } else if config::use_console_logging() {
        sinks = sinks.with_console(min_level);
    }

    LoggingService::new(Arc::new(sinks), min_level)
}

/// Service backed by a memory logger, plus a handle to inspect it
pub fn create_test_service(min_level: LogLevel) -> (LoggingService, Arc<MemoryLogger>) {
    let memory = Arc::new(MemoryLogger::new());
    (LoggingService::new(memory.clone(), min_level), memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_memory_logger_records_events() {
        let (service, memory) = create_test_service(LogLevel::Debug);

        service.log_error(codes::parsing::MISSING_VALUE, "Missing value");
        service.log_success(codes::success::LINE_PARSED, "Parsed");
        service.log_debug("state transition");

        assert_eq!(memory.event_count(), 3);
        assert!(memory.has_error_with_code(codes::parsing::MISSING_VALUE));
        assert!(memory.has_success_with_code(codes::success::LINE_PARSED));
    }

    #[test]
    fn test_level_filtering() {
        let (service, memory) = create_test_service(LogLevel::Warning);

        service.log_info("dropped");
        service.log_debug("dropped");
        service.log_warning_with_code(codes::completion::PREFIX_NOT_PARSEABLE, "kept");

        assert_eq!(memory.event_count(), 1);
    }

    #[test]
    fn test_halting_errors_bypass_filter() {
        let (mut service, memory) = create_test_service(LogLevel::Debug);
        service.set_min_level(LogLevel::Error);
        service.log_error(codes::parsing::CONTEXT_NOT_RESET, "reused");

        let summary = memory.get_summary();
        assert!(summary.has_errors());
        assert!(summary.has_critical_errors());
    }

    #[test]
    fn test_memory_logger_is_bounded() {
        let memory = MemoryLogger::with_capacity(2);
        memory.log(&LogEvent::info("one"));
        memory.log(&LogEvent::info("two"));
        memory.log(&LogEvent::info("three"));

        let messages: Vec<String> = memory.get_events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let (multi, memory) = MultiLogger::new().with_memory();
        let service = LoggingService::new(Arc::new(multi), LogLevel::Info);
        service.log_error_with_span(
            codes::parsing::UNEXPECTED_CHARACTER,
            "Unexpected ')'",
            Span::at(4),
        );

        let errors = memory.get_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Some(Span::at(4)));
    }
}
