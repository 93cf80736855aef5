/// Currency in which all gains, losses and summaries are expressed.
pub const DEFAULT_REPORTING_CURRENCY: &str = "NOK";

/// Decimal precision for valuation calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Default absolute tolerance when matching sale proceeds to bank wires.
pub const DEFAULT_WIRE_TOLERANCE: &str = "5.00";

/// Default settlement window (days after the sale date) for wire matching.
pub const DEFAULT_SETTLEMENT_WINDOW_DAYS: i64 = 7;

/// How many days a rate lookup walks back over weekends/holidays before
/// giving up.
pub const RATE_BACKTRACK_DAYS: i64 = 6;
