//! Failure reporting for the chain tier

use tenq_core::TenqError;

/// One chain failure, rendered as
/// `tenq: <op> failed [operands: a, b -> out]: <error>`.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub op: &'static str,
    pub operands: Vec<String>,
    pub output: String,
    pub error: TenqError,
}

impl Failure {
    pub fn line(&self) -> String {
        format!(
            "tenq: {} failed [operands: {} -> {}]: {}",
            self.op,
            self.operands.join(", "),
            self.output,
            self.error
        )
    }

    /// Send the line to the log, and to stderr when asked.
    pub fn report(&self, to_stderr: bool) {
        let line = self.line();
        tracing::error!(target: "tenq::chain", op = self.op, "{}", line);
        if to_stderr {
            eprintln!("{}", line);
        }
    }
}
