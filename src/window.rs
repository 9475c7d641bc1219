//! Window specifications (`Window.partitionBy(...).orderBy(...).rowsBetween(...)`) and
//! their evaluation as Polars expressions.
//!
//! Evaluation sorts a copy of the frame by partition and ordering keys, tags every row with
//! its sorted position and expresses each function with `over`, `rank`, `cum_sum` and `shift`
//! against that position. The original row order is restored afterwards.

use crate::functions::SortOrder;
use polars::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

const ROW_ID: &str = "__window_row_id";
const POS: &str = "__window_pos";
const TMP_PEER_START: &str = "__window_peer_start";
const TMP_RUNNING: &str = "__window_running";
const TMP_COUNT: &str = "__window_count";
const VALUE_PREFIX: &str = "__window_value_";

static NEXT_VALUE_ID: AtomicU64 = AtomicU64::new(0);

/// Widest bounded ROWS frame (`rows_between(-n, m)`) that is expanded into shifted terms.
const MAX_BOUNDED_FRAME: i64 = 1024;

/// Entry point for window specifications, mirroring PySpark's `Window` class.
pub struct Window;

impl Window {
    pub const UNBOUNDED_PRECEDING: i64 = i64::MIN;
    pub const UNBOUNDED_FOLLOWING: i64 = i64::MAX;
    pub const CURRENT_ROW: i64 = 0;

    pub fn partition_by<I, S>(columns: I) -> WindowSpec
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        WindowSpec::default().partition_by(columns)
    }

    pub fn order_by<I, S>(orders: I) -> WindowSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<SortOrder>,
    {
        WindowSpec::default().order_by(orders)
    }
}

/// Partitioning, ordering and frame of a window.
#[derive(Debug, Clone, Default)]
pub struct WindowSpec {
    partition_by: Vec<String>,
    order_by: Vec<SortOrder>,
    frame: Option<(i64, i64)>,
}

impl WindowSpec {
    pub fn partition_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.partition_by = columns
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        self
    }

    pub fn order_by<I, S>(mut self, orders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SortOrder>,
    {
        self.order_by = orders.into_iter().map(Into::into).collect();
        self
    }

    /// ROWS frame relative to the current row. Use [`Window::UNBOUNDED_PRECEDING`],
    /// [`Window::CURRENT_ROW`], [`Window::UNBOUNDED_FOLLOWING`] or signed offsets.
    pub fn rows_between(mut self, start: i64, end: i64) -> Self {
        self.frame = Some((start, end));
        self
    }

    pub fn partition_columns(&self) -> &[String] {
        &self.partition_by
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    RowNumber,
    Rank,
    DenseRank,
}

impl RankingKind {
    fn sql_name(&self) -> &'static str {
        match self {
            RankingKind::RowNumber => "row_number()",
            RankingKind::Rank => "rank()",
            RankingKind::DenseRank => "dense_rank()",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

/// What a column computes when evaluated over a window.
#[derive(Debug, Clone)]
pub(crate) enum WindowFunction {
    Ranking(RankingKind),
    Aggregate { kind: AggKind, input: Expr },
    /// Any other expression, evaluated per partition.
    Expression(Expr),
}

/// A function bound to a window by `Column::over`. Its result is materialized into a
/// temporary column, which the owning `Column`'s expression refers to by name.
#[derive(Debug, Clone)]
pub(crate) struct WindowedColumn {
    function: WindowFunction,
    spec: WindowSpec,
    column_name: String,
}

impl WindowedColumn {
    pub(crate) fn new(function: WindowFunction, spec: WindowSpec) -> Self {
        let id = NEXT_VALUE_ID.fetch_add(1, Ordering::Relaxed);
        WindowedColumn {
            function,
            spec,
            column_name: format!("{VALUE_PREFIX}{id}"),
        }
    }

    pub(crate) fn column_name(&self) -> &str {
        &self.column_name
    }

    pub(crate) fn spec(&self) -> &WindowSpec {
        &self.spec
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Partition,
    /// Spark's default frame with an ORDER BY: unbounded preceding to the current row,
    /// including rows that tie with it on the ordering keys.
    RunningWithPeers,
    Rows(i64, i64),
}

#[derive(Debug, Clone, Copy)]
enum Reducer {
    Sum,
    Min,
    Max,
}

impl Reducer {
    fn total(self, e: Expr) -> Expr {
        match self {
            Reducer::Sum => e.sum(),
            Reducer::Min => e.min(),
            Reducer::Max => e.max(),
        }
    }

    fn running(self, e: Expr) -> Expr {
        match self {
            Reducer::Sum => e.cum_sum(false),
            Reducer::Min => e.cum_min(false),
            Reducer::Max => e.cum_max(false),
        }
    }
}

struct Partitioning {
    partition: Vec<Expr>,
    peers: Vec<Expr>,
}

impl Partitioning {
    fn over_partition(&self, e: Expr) -> Expr {
        if self.partition.is_empty() {
            e
        } else {
            e.over(self.partition.clone())
        }
    }

    fn over_peers(&self, e: Expr) -> Expr {
        if self.peers.is_empty() {
            e
        } else {
            e.over(self.peers.clone())
        }
    }
}

/// Add `out_name` to `df`, computed by `windowed`. `partition` holds the resolved
/// partition column names. Row order of `df` is preserved.
pub(crate) fn evaluate(
    df: &DataFrame,
    out_name: &str,
    windowed: &WindowedColumn,
    partition: &[String],
) -> PolarsResult<DataFrame> {
    let spec = &windowed.spec;
    if let WindowFunction::Ranking(kind) = &windowed.function {
        if spec.order_by.is_empty() {
            return Err(PolarsError::InvalidOperation(
                format!(
                    "{} requires the window to be ordered, e.g. Window::order_by([...])",
                    kind.sql_name()
                )
                .into(),
            ));
        }
    }
    let original: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let partition_exprs: Vec<Expr> = partition.iter().map(|p| col(p.as_str())).collect();
    let order_exprs: Vec<Expr> = spec.order_by.iter().map(|o| o.expr.clone()).collect();
    let mut peers = partition_exprs.clone();
    peers.extend(order_exprs.iter().cloned());
    let parts = Partitioning {
        partition: partition_exprs.clone(),
        peers,
    };

    let mut lf = df.clone().lazy().with_row_index(ROW_ID, None);
    if !parts.peers.is_empty() {
        let mut descending = vec![false; partition_exprs.len()];
        descending.extend(spec.order_by.iter().map(|o| o.descending));
        let mut nulls_last = vec![false; partition_exprs.len()];
        nulls_last.extend(spec.order_by.iter().map(|o| o.nulls_last));
        lf = lf.sort_by_exprs(
            parts.peers.clone(),
            SortMultipleOptions::new()
                .with_order_descending_multi(descending)
                .with_nulls_last_multi(nulls_last)
                .with_maintain_order(true),
        );
    }
    lf = lf
        .with_row_index(POS, None)
        .with_column(col(POS).cast(DataType::Int64));

    let (lf, value) = match &windowed.function {
        WindowFunction::Ranking(kind) => ranking(lf, *kind, &parts),
        WindowFunction::Aggregate { kind, input } => {
            let frame = match spec.frame {
                Some((Window::UNBOUNDED_PRECEDING, Window::UNBOUNDED_FOLLOWING)) => {
                    Frame::Partition
                }
                Some((start, end)) => Frame::Rows(start, end),
                None if order_exprs.is_empty() => Frame::Partition,
                None => Frame::RunningWithPeers,
            };
            aggregate(lf, *kind, input.clone(), frame, &parts)?
        }
        WindowFunction::Expression(expr) => {
            let value = parts.over_partition(expr.clone());
            (lf, value)
        }
    };

    let mut keep: Vec<Expr> = original.iter().map(|n| col(n.as_str())).collect();
    if !original.iter().any(|n| n == out_name) {
        keep.push(col(out_name));
    }
    lf.with_column(value.alias(out_name))
        .sort([ROW_ID], SortMultipleOptions::default())
        .select(keep)
        .collect()
}

/// Ranks are taken over the sorted position: `row_number` ranks positions ordinally,
/// `rank`/`dense_rank` rank the first position of each row's ordering peers.
fn ranking(lf: LazyFrame, kind: RankingKind, parts: &Partitioning) -> (LazyFrame, Expr) {
    let method = match kind {
        RankingKind::RowNumber => RankMethod::Ordinal,
        RankingKind::Rank => RankMethod::Min,
        RankingKind::DenseRank => RankMethod::Dense,
    };
    let opts = RankOptions {
        method,
        descending: false,
    };
    let (lf, ranked) = match kind {
        RankingKind::RowNumber => (lf, col(POS)),
        RankingKind::Rank | RankingKind::DenseRank => (
            lf.with_column(parts.over_peers(col(POS).min()).alias(TMP_PEER_START)),
            col(TMP_PEER_START),
        ),
    };
    let value = parts
        .over_partition(ranked.rank(opts, None))
        .cast(DataType::Int32);
    (lf, value)
}

fn aggregate(
    lf: LazyFrame,
    kind: AggKind,
    input: Expr,
    frame: Frame,
    parts: &Partitioning,
) -> PolarsResult<(LazyFrame, Expr)> {
    let non_null = input.clone().is_not_null().cast(DataType::Int64);
    let value = input.cast(DataType::Float64);
    let (reducer, filled) = match kind {
        AggKind::Sum | AggKind::Avg | AggKind::Count => {
            (Reducer::Sum, value.fill_null(lit(0.0f64)))
        }
        AggKind::Min => (Reducer::Min, value.fill_null(lit(f64::INFINITY))),
        AggKind::Max => (Reducer::Max, value.fill_null(lit(f64::NEG_INFINITY))),
    };

    let (lf, reduced, count) = match frame {
        Frame::Partition => (
            lf,
            parts.over_partition(reducer.total(filled)),
            parts.over_partition(non_null.sum()),
        ),
        Frame::RunningWithPeers => {
            let lf = lf.with_columns([
                parts
                    .over_partition(reducer.running(filled))
                    .alias(TMP_RUNNING),
                parts
                    .over_partition(non_null.cum_sum(false))
                    .alias(TMP_COUNT),
            ]);
            (
                lf,
                parts.over_peers(col(TMP_RUNNING).last()),
                parts.over_peers(col(TMP_COUNT).last()),
            )
        }
        Frame::Rows(start, end) => {
            if end == Window::UNBOUNDED_PRECEDING || start == Window::UNBOUNDED_FOLLOWING {
                return Err(PolarsError::InvalidOperation(
                    format!("invalid window frame rows_between({start}, {end})").into(),
                ));
            }
            let reduced = match reducer {
                Reducer::Sum => rows_frame_sum(filled, start, end, lit(0.0f64), parts)?,
                _ if start == Window::UNBOUNDED_PRECEDING && end == Window::CURRENT_ROW => {
                    parts.over_partition(reducer.running(filled))
                }
                _ => {
                    return Err(PolarsError::InvalidOperation(
                        "min/max over a window support only the whole partition or \
                         rows_between(UNBOUNDED_PRECEDING, CURRENT_ROW)"
                            .into(),
                    ))
                }
            };
            let count = rows_frame_sum(non_null, start, end, lit(0i64), parts)?;
            (lf, reduced, count)
        }
    };

    let null_double = lit(NULL).cast(DataType::Float64);
    let has_values = count.clone().gt(lit(0i64));
    let value = match kind {
        AggKind::Count => count,
        AggKind::Avg => when(has_values)
            .then(reduced / count.cast(DataType::Float64))
            .otherwise(null_double),
        AggKind::Sum | AggKind::Min | AggKind::Max => {
            when(has_values).then(reduced).otherwise(null_double)
        }
    };
    Ok((lf, value))
}

/// Sum of `e` over a ROWS frame `[current + start, current + end]` within the partition.
/// `e` must not contain nulls; `zero` is its additive identity.
fn rows_frame_sum(
    e: Expr,
    start: i64,
    end: i64,
    zero: Expr,
    parts: &Partitioning,
) -> PolarsResult<Expr> {
    if start > end {
        return Ok(zero);
    }
    let total = || parts.over_partition(e.clone().sum());
    Ok(match (start, end) {
        (Window::UNBOUNDED_PRECEDING, Window::UNBOUNDED_FOLLOWING) => total(),
        (Window::UNBOUNDED_PRECEDING, end) => {
            let prefix = parts.over_partition(e.clone().cum_sum(false).shift(lit(-end)));
            // past the partition end the prefix is the whole partition; before its start, empty
            let fill = if end >= 0 { total() } else { zero };
            prefix.fill_null(fill)
        }
        (start, Window::UNBOUNDED_FOLLOWING) => {
            let suffix = parts.over_partition(e.clone().cum_sum(true).shift(lit(-start)));
            let fill = if start <= 0 { total() } else { zero };
            suffix.fill_null(fill)
        }
        (start, end) => {
            let too_wide = end
                .checked_sub(start)
                .map_or(true, |width| width > MAX_BOUNDED_FRAME);
            if too_wide {
                return Err(PolarsError::InvalidOperation(
                    format!(
                        "window frame rows_between({start}, {end}) is wider than {MAX_BOUNDED_FRAME} rows"
                    )
                    .into(),
                ));
            }
            let mut sum: Option<Expr> = None;
            for offset in start..=end {
                let term = e.clone().shift(lit(-offset)).fill_null(zero.clone());
                sum = Some(match sum {
                    Some(acc) => acc + term,
                    None => term,
                });
            }
            match sum {
                Some(s) => parts.over_partition(s),
                None => zero,
            }
        }
    })
}
