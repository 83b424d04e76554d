//! Shared test harness: recording mock adapters wired into a real
//! `CheckoutService`.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use checkout_api::auth::RequestContext;
use checkout_api::clients::{
    AddressClient, CartClient, InventoryClient, OrderClient, PaymentClient,
};
use checkout_api::errors::CheckoutError;
use checkout_api::events::EventPublisher;
use checkout_api::message_queue::{InMemoryMessageQueue, Message, MessageQueue, MessageQueueError};
use checkout_api::models::{
    Address, CartItem, CartSnapshot, CreatedOrder, NewOrder, OrderProjection, PaymentInstruction,
    ReservationItem, StockLocation,
};
use checkout_api::services::CheckoutService;

pub const TOPIC: &str = "order-created";

pub fn ctx() -> RequestContext {
    RequestContext {
        user_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        token: "bearer-token".to_string(),
    }
}

/// Cart from the happy-path scenario: one line, SKU1 x2 at 50.00,
/// subtotal 100, no discount, INR.
pub fn one_line_cart() -> CartSnapshot {
    CartSnapshot {
        items: vec![CartItem {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            sku: "SKU1".to_string(),
            quantity: 2,
            unit_price: dec!(50.00),
            total_price: dec!(100.00),
        }],
        subtotal: dec!(100),
        discount_amount: dec!(0),
        currency: "INR".to_string(),
    }
}

pub fn empty_cart() -> CartSnapshot {
    CartSnapshot {
        items: Vec::new(),
        subtotal: dec!(0),
        discount_amount: dec!(0),
        currency: "INR".to_string(),
    }
}

pub fn address_a1() -> Address {
    Address {
        id: Uuid::new_v4(),
        line1: "42 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        postcode: "560001".to_string(),
        country: "IN".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Mock adapters
// ---------------------------------------------------------------------------

pub struct MockCart {
    pub cart: Mutex<CartSnapshot>,
    pub fetch_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub clear_result: Mutex<Result<(), CheckoutError>>,
}

impl MockCart {
    pub fn new(cart: CartSnapshot) -> Arc<Self> {
        Arc::new(Self {
            cart: Mutex::new(cart),
            fetch_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            clear_result: Mutex::new(Ok(())),
        })
    }

    pub fn set_cart(&self, cart: CartSnapshot) {
        *self.cart.lock().unwrap() = cart;
    }
}

#[async_trait]
impl CartClient for MockCart {
    async fn fetch_cart(&self, _ctx: &RequestContext) -> Result<CartSnapshot, CheckoutError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn clear_cart(&self, _ctx: &RequestContext) -> Result<(), CheckoutError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.clear_result.lock().unwrap().clone()
    }
}

pub struct MockAddress {
    pub result: Mutex<Result<Address, CheckoutError>>,
    pub calls: AtomicUsize,
}

impl MockAddress {
    pub fn new(address: Address) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(address)),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AddressClient for MockAddress {
    async fn fetch_address(
        &self,
        _ctx: &RequestContext,
        _address_id: Uuid,
    ) -> Result<Address, CheckoutError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

pub struct MockInventory {
    pub locations: Mutex<HashMap<String, Vec<StockLocation>>>,
    pub stock_calls: AtomicUsize,
    pub reserve_calls: Mutex<Vec<(Uuid, Vec<ReservationItem>)>>,
    pub reserve_result: Mutex<Result<(), CheckoutError>>,
    pub release_calls: Mutex<Vec<Uuid>>,
    pub release_result: Mutex<Result<(), CheckoutError>>,
}

impl MockInventory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            locations: Mutex::new(HashMap::new()),
            stock_calls: AtomicUsize::new(0),
            reserve_calls: Mutex::new(Vec::new()),
            reserve_result: Mutex::new(Ok(())),
            release_calls: Mutex::new(Vec::new()),
            release_result: Mutex::new(Ok(())),
        })
    }

    pub fn set_locations(&self, sku: &str, locations: Vec<StockLocation>) {
        self.locations
            .lock()
            .unwrap()
            .insert(sku.to_string(), locations);
    }

    /// The reservation handle the saga generated, captured from the reserve
    /// call.
    pub fn reserved_id(&self) -> Option<Uuid> {
        self.reserve_calls.lock().unwrap().first().map(|(id, _)| *id)
    }
}

#[async_trait]
impl InventoryClient for MockInventory {
    async fn stock_locations(
        &self,
        _ctx: &RequestContext,
        sku: &str,
    ) -> Result<Vec<StockLocation>, CheckoutError> {
        self.stock_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .locations
            .lock()
            .unwrap()
            .get(sku)
            .cloned()
            .unwrap_or_default())
    }

    async fn reserve(
        &self,
        _ctx: &RequestContext,
        order_id: Uuid,
        items: &[ReservationItem],
    ) -> Result<(), CheckoutError> {
        self.reserve_calls
            .lock()
            .unwrap()
            .push((order_id, items.to_vec()));
        self.reserve_result.lock().unwrap().clone()
    }

    async fn release(
        &self,
        _ctx: &RequestContext,
        reservation_id: Uuid,
    ) -> Result<(), CheckoutError> {
        self.release_calls.lock().unwrap().push(reservation_id);
        self.release_result.lock().unwrap().clone()
    }
}

pub struct MockPayment {
    pub process_result: Mutex<Result<Uuid, CheckoutError>>,
    pub process_calls: Mutex<Vec<PaymentInstruction>>,
    pub refund_calls: Mutex<Vec<(Uuid, String)>>,
    pub refund_result: Mutex<Result<(), CheckoutError>>,
    pub lookup_result: Mutex<Result<Option<Uuid>, CheckoutError>>,
    pub lookup_calls: AtomicUsize,
}

impl MockPayment {
    pub fn new(payment_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            process_result: Mutex::new(Ok(payment_id)),
            process_calls: Mutex::new(Vec::new()),
            refund_calls: Mutex::new(Vec::new()),
            refund_result: Mutex::new(Ok(())),
            lookup_result: Mutex::new(Ok(None)),
            lookup_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PaymentClient for MockPayment {
    async fn process(
        &self,
        _ctx: &RequestContext,
        instruction: &PaymentInstruction,
    ) -> Result<Uuid, CheckoutError> {
        self.process_calls.lock().unwrap().push(instruction.clone());
        self.process_result.lock().unwrap().clone()
    }

    async fn refund(
        &self,
        _ctx: &RequestContext,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<(), CheckoutError> {
        self.refund_calls
            .lock()
            .unwrap()
            .push((payment_id, reason.to_string()));
        self.refund_result.lock().unwrap().clone()
    }

    async fn lookup_by_transaction(
        &self,
        _ctx: &RequestContext,
        _transaction_id: &str,
    ) -> Result<Option<Uuid>, CheckoutError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup_result.lock().unwrap().clone()
    }
}

pub struct MockOrder {
    pub create_result: Mutex<Result<CreatedOrder, CheckoutError>>,
    pub create_calls: Mutex<Vec<NewOrder>>,
    pub find_results: Mutex<VecDeque<Result<Option<OrderProjection>, CheckoutError>>>,
    pub find_calls: AtomicUsize,
}

impl MockOrder {
    pub fn new(created: CreatedOrder) -> Arc<Self> {
        Arc::new(Self {
            create_result: Mutex::new(Ok(created)),
            create_calls: Mutex::new(Vec::new()),
            find_results: Mutex::new(VecDeque::new()),
            find_calls: AtomicUsize::new(0),
        })
    }

    pub fn push_find_result(&self, result: Result<Option<OrderProjection>, CheckoutError>) {
        self.find_results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl OrderClient for MockOrder {
    async fn create_order(
        &self,
        _ctx: &RequestContext,
        order: &NewOrder,
    ) -> Result<CreatedOrder, CheckoutError> {
        self.create_calls.lock().unwrap().push(order.clone());
        self.create_result.lock().unwrap().clone()
    }

    async fn find_by_payment(
        &self,
        _ctx: &RequestContext,
        _payment_id: Uuid,
    ) -> Result<Option<OrderProjection>, CheckoutError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.find_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

/// Queue whose publishes always fail, for proving best-effort semantics.
pub struct FailingQueue;

#[async_trait]
impl MessageQueue for FailingQueue {
    async fn publish(&self, _message: Message) -> Result<(), MessageQueueError> {
        Err(MessageQueueError::ConnectionError("bus is down".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub carts: Arc<MockCart>,
    pub addresses: Arc<MockAddress>,
    pub inventory: Arc<MockInventory>,
    pub payments: Arc<MockPayment>,
    pub orders: Arc<MockOrder>,
    pub queue: Arc<InMemoryMessageQueue>,
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub service: CheckoutService,
}

/// Happy-path wiring: SKU1 is stocked at one location with plenty of
/// availability, payment succeeds with P1, order lands as O1 / ORD-1.
pub fn harness() -> TestHarness {
    let payment_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();

    let carts = MockCart::new(one_line_cart());
    let addresses = MockAddress::new(address_a1());
    let inventory = MockInventory::new();
    inventory.set_locations(
        "SKU1",
        vec![StockLocation {
            location_id: Uuid::new_v4(),
            available_qty: 5,
        }],
    );
    let payments = MockPayment::new(payment_id);
    let orders = MockOrder::new(CreatedOrder {
        id: order_id,
        order_number: "ORD-1".to_string(),
    });
    let queue = Arc::new(InMemoryMessageQueue::new());

    let service = CheckoutService::new(
        carts.clone(),
        addresses.clone(),
        inventory.clone(),
        payments.clone(),
        orders.clone(),
        EventPublisher::new(queue.clone(), TOPIC.to_string()),
        "INR".to_string(),
    );

    TestHarness {
        carts,
        addresses,
        inventory,
        payments,
        orders,
        queue,
        payment_id,
        order_id,
        service,
    }
}

/// Same wiring, but every event publish fails.
pub fn harness_with_failing_bus() -> TestHarness {
    let mut harness = harness();
    harness.service = CheckoutService::new(
        harness.carts.clone(),
        harness.addresses.clone(),
        harness.inventory.clone(),
        harness.payments.clone(),
        harness.orders.clone(),
        EventPublisher::new(Arc::new(FailingQueue), TOPIC.to_string()),
        "INR".to_string(),
    );
    harness
}
