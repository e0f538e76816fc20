//! # XY Sweep
//!
//! A systematic traversal of a rectangular grid, moving the print head to every point.
//!
//! The traversal is x-major: the head moves to a column with an X-only move, then visits
//! every Y of that column with Y-only moves, and only then advances X.
//!
//! Two layers are provided:
//!
//! * **[`SweepRegion::points`]**: the pure grid as an [`Iterator`] of [`SweepStep`]s.
//! * **[`Sweep`]**: a lazy [`Stream`] that dispatches the moves of each step when the
//!   consumer pulls it, then yields the reached `(x, y)`.
//!
//! ## Inclusive bounds
//!
//! Axis coordinates are computed as `start + i * step` rather than by accumulating `step`,
//! and the number of points is `floor((end - start) / step + 1e-9) + 1`. The tolerance
//! keeps the end point when `(end - start) / step` lands just below an integer, e.g. a
//! range of `0.3` in steps of `0.1`. Coordinates are clamped to `end`.
use crate::client::{ClientError, KlipperClient};
use crate::command::MoveRequest;
use crate::rpc::Connector;
use futures_util::{
    Stream, StreamExt,
    stream::{self, BoxStream},
};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Step used for both axes unless told otherwise.
pub const DEFAULT_STEP: f64 = 1.0;

const BOUND_TOLERANCE: f64 = 1e-9;

/// Errors that can occur when defining a sweep region.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InvalidRegion {
    #[error("{axis}_end ({end}) must not be smaller than {axis}_start ({start})")]
    Reversed { axis: char, start: f64, end: f64 },
    #[error("{axis} step must be a positive number, got {step}")]
    InvalidStep { axis: char, step: f64 },
    #[error("{axis} bounds must be finite")]
    NonFinite { axis: char },
    #[error("Region has too many points to traverse")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    start: f64,
    end: f64,
    step: f64,
    count: usize,
}

impl Axis {
    fn new(name: char, start: f64, end: f64, step: f64) -> Result<Self, InvalidRegion> {
        if !start.is_finite() || !end.is_finite() {
            return Err(InvalidRegion::NonFinite { axis: name });
        }
        if start > end {
            return Err(InvalidRegion::Reversed {
                axis: name,
                start,
                end,
            });
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(InvalidRegion::InvalidStep { axis: name, step });
        }

        let intervals = ((end - start) / step + BOUND_TOLERANCE).floor();
        if intervals >= usize::MAX as f64 {
            return Err(InvalidRegion::TooLarge);
        }

        Ok(Self {
            start,
            end,
            step,
            count: intervals as usize + 1,
        })
    }

    fn at(&self, index: usize) -> f64 {
        (self.start + index as f64 * self.step).min(self.end)
    }
}

/// The rectangle to sweep, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRegion {
    x: Axis,
    y: Axis,
}

impl SweepRegion {
    /// A region swept with the same `step` on both axes.
    ///
    /// # Returns
    ///
    /// * `Err(InvalidRegion)` - If a start is past its end, a bound is not finite or
    ///   `step` is not a positive number.
    pub fn new(
        x_start: f64,
        x_end: f64,
        y_start: f64,
        y_end: f64,
        step: f64,
    ) -> Result<Self, InvalidRegion> {
        Self::with_steps(x_start, x_end, y_start, y_end, step, step)
    }

    /// A region with a different step per axis.
    pub fn with_steps(
        x_start: f64,
        x_end: f64,
        y_start: f64,
        y_end: f64,
        x_step: f64,
        y_step: f64,
    ) -> Result<Self, InvalidRegion> {
        let x = Axis::new('x', x_start, x_end, x_step)?;
        let y = Axis::new('y', y_start, y_end, y_step)?;

        if x.count.checked_mul(y.count).is_none() {
            return Err(InvalidRegion::TooLarge);
        }

        Ok(Self { x, y })
    }

    /// Total number of points in the grid.
    pub fn len(&self) -> usize {
        self.x.count * self.y.count
    }

    /// A region always holds at least its start corner.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The grid points in traversal order.
    pub fn points(&self) -> SweepPoints {
        SweepPoints {
            region: *self,
            next: 0,
        }
    }
}

/// One grid point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStep {
    pub x: f64,
    pub y: f64,
    /// Whether this is the first point of its column, i.e. the head has to move in X.
    pub new_column: bool,
}

/// Iterator over the points of a [`SweepRegion`], x-major.
#[derive(Debug, Clone)]
pub struct SweepPoints {
    region: SweepRegion,
    next: usize,
}

impl Iterator for SweepPoints {
    type Item = SweepStep;

    fn next(&mut self) -> Option<SweepStep> {
        if self.next >= self.region.len() {
            return None;
        }

        let column = self.next / self.region.y.count;
        let row = self.next % self.region.y.count;
        self.next += 1;

        Some(SweepStep {
            x: self.region.x.at(column),
            y: self.region.y.at(row),
            new_column: row == 0,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.region.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SweepPoints {}

/// A sweep in progress, see [`KlipperClient::xy_sweep`].
///
/// Nothing moves until the stream is polled. Each item is produced after the moves for
/// that point succeeded; if a move fails, the error is yielded in place of the point and
/// the stream ends. Dropping the stream stops the sweep.
pub struct Sweep<'a> {
    inner: BoxStream<'a, Result<(f64, f64), ClientError>>,
}

impl<'a> Sweep<'a> {
    pub(crate) fn new<C: Connector>(client: &'a KlipperClient<C>, region: SweepRegion) -> Self {
        let inner = stream::unfold(Some(region.points()), move |points| async move {
            // `None` once a failure has been yielded
            let Some(mut points) = points else {
                return None;
            };
            let Some(step) = points.next() else {
                return None;
            };

            match visit(client, &step).await {
                Ok(()) => Some((Ok((step.x, step.y)), Some(points))),
                Err(err) => Some((Err(err), None)),
            }
        });

        Self {
            inner: inner.boxed(),
        }
    }

    /// Moves to the next point and returns it, or `None` once the sweep is over.
    pub async fn next_point(&mut self) -> Option<Result<(f64, f64), ClientError>> {
        self.inner.next().await
    }
}

impl Stream for Sweep<'_> {
    type Item = Result<(f64, f64), ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

async fn visit<C: Connector>(
    client: &KlipperClient<C>,
    step: &SweepStep,
) -> Result<(), ClientError> {
    if step.new_column {
        client.move_to(MoveRequest::new().x(step.x)).await?;
    }
    client.move_to(MoveRequest::new().y(step.y)).await
}
