//! Connections between component ports and fan-in aggregation.

use tw_core::{ComponentId, ConnectionId, TwResult, Value};

/// Combination rule of an aggregating input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aggregation {
    /// Arithmetic sum of all delivered values (e.g. total airflow into a space).
    #[default]
    Sum,
    Mean,
    Min,
    Max,
}

impl Aggregation {
    /// Combine the values delivered by all senders this step.
    ///
    /// Undefined senders are skipped; when nothing is defined the result is undefined.
    pub fn combine<'a, I>(self, values: I) -> TwResult<Option<Value>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut acc = first.clone();
        let mut count = 1usize;
        for value in iter {
            acc = match self {
                Aggregation::Sum | Aggregation::Mean => acc.zip_with(value, |a, b| a + b)?,
                Aggregation::Min => acc.zip_with(value, f64::min)?,
                Aggregation::Max => acc.zip_with(value, f64::max)?,
            };
            count += 1;
        }
        if self == Aggregation::Mean {
            let n = count as f64;
            acc = acc.map(|v| v / n);
        }
        Ok(Some(acc))
    }

    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

/// Directed binding from a sender's output port to a receiver's input port.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ComponentId,
    pub sender_port: String,
    pub receiver: ComponentId,
    pub receiver_port: String,
    /// Explicit allow-cycle annotation: the edge is ignored when ordering, and the
    /// receiver reads whatever the sender produced most recently.
    pub feedback: bool,
}

impl Connection {
    pub fn touches(&self, id: &ComponentId) -> bool {
        &self.sender == id || &self.receiver == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: f64) -> Value {
        Value::Scalar(v)
    }

    #[test]
    fn sum_of_two_senders() {
        let values = [s(3.0), s(4.0)];
        assert_eq!(Aggregation::Sum.combine(&values).unwrap(), Some(s(7.0)));
    }

    #[test]
    fn mean_min_max() {
        let values = [s(1.0), s(5.0), s(3.0)];
        assert_eq!(Aggregation::Mean.combine(&values).unwrap(), Some(s(3.0)));
        assert_eq!(Aggregation::Min.combine(&values).unwrap(), Some(s(1.0)));
        assert_eq!(Aggregation::Max.combine(&values).unwrap(), Some(s(5.0)));
    }

    #[test]
    fn nothing_defined_is_undefined() {
        assert_eq!(Aggregation::Sum.combine(&[]).unwrap(), None);
    }

    #[test]
    fn vectors_are_combined_elementwise() {
        let values = [Value::from(vec![1.0, 2.0]), Value::from(vec![0.5, 0.5])];
        assert_eq!(
            Aggregation::Sum.combine(&values).unwrap(),
            Some(Value::from(vec![1.5, 2.5]))
        );
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let values = [Value::from(vec![1.0, 2.0]), s(1.0)];
        assert!(Aggregation::Sum.combine(&values).is_err());
    }
}
