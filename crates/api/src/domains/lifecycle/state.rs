use infra::repos::BookingStatus;

/// Something that may move a booking forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Paid,
    PaymentExpired,
    CustomerCancelled,
    ScheduledEndReached,
    OwnerCancelled,
    ReviewPosted,
}

impl BookingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::Paid => "paid",
            BookingEvent::PaymentExpired => "payment_expired",
            BookingEvent::CustomerCancelled => "customer_cancelled",
            BookingEvent::ScheduledEndReached => "scheduled_end_reached",
            BookingEvent::OwnerCancelled => "owner_cancelled",
            BookingEvent::ReviewPosted => "review_posted",
        }
    }
}

/// The status `event` leads to from `current`, or `None` if the event does
/// not apply in that state.
pub fn next_status(current: BookingStatus, event: BookingEvent) -> Option<BookingStatus> {
    use BookingEvent::*;
    use BookingStatus::*;

    match (current, event) {
        (AwaitingPayment, Paid) => Some(Confirmed),
        (AwaitingPayment, PaymentExpired | CustomerCancelled) => Some(Expired),
        (Confirmed, ScheduledEndReached) => Some(Fulfilled),
        (Confirmed, OwnerCancelled) => Some(Cancelled),
        (Fulfilled, ReviewPosted) => Some(Reviewed),
        _ => None,
    }
}
