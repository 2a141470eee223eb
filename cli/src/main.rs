use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use tradhub::backend::demo::DemoBackend;
use tradhub::backend::supabase::SupabaseBackend;
use time::OffsetDateTime;
use tradhub::backend::{AuthBackend, BackendError, Identity, PaymentStatus, ProfilePatch, SignUpRequest, UserType};
use tradhub::catalog::{Catalog, ProductFilters};
use tradhub::chat::{self, ChatService};
use tradhub::config::BackendConfig;
use tradhub::realtime::phoenix::RealtimeClient;
use tradhub::registration::{self, Advance, PaymentOptions, RegistrationError, RegistrationForm};
use tradhub::suppliers::{self, ProductDraft, ProductError, SupplierFilters, SupplierSort, SupplierTab, Suppliers};
use tradhub::{SessionCoordinator, SessionState};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}", .0.display_message())]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Registration(#[from] RegistrationError),
    #[error("{0}")]
    Product(#[from] ProductError),
    #[error("not signed in; pass --identifier and --password")]
    NotSignedIn,
    #[error("`{0}` needs the hosted backend; run without --demo")]
    DemoUnsupported(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tradhub", about = "TradHub marketplace client")]
struct Cli {
    /// Use the in-process demo backend instead of the hosted service. It
    /// starts with one paid supplier account, `demo@tradhub.test` /
    /// `demo123`; nothing persists between runs.
    #[arg(long, env = "TRADHUB_DEMO", default_value_t = false)]
    demo: bool,

    /// Email, phone number or username to sign in with before the command.
    #[arg(long, env = "TRADHUB_IDENTIFIER")]
    identifier: Option<String>,

    #[arg(long, env = "TRADHUB_PASSWORD", requires = "identifier")]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current identity.
    Whoami,
    SignUp(SignUpArgs),
    SignOut,
    /// Show the profile, or update it when any field is given.
    Profile(ProfileArgs),
    Products(ProductArgs),
    Suggest {
        text: String,
    },
    Countries,
    Cities {
        country_code: String,
    },
    Favorites(FavoriteArgs),
    /// Browse the directory of paid suppliers.
    Suppliers(SupplierArgs),
    /// Manage the signed-in supplier's own listings.
    MyProducts(MyProductsCommand),
    Chat(ChatCommand),
}

#[derive(Args, Debug)]
struct SignUpArgs {
    #[arg(long)]
    email: String,
    #[arg(long = "new-password")]
    new_password: String,
    /// Defaults to the new password.
    #[arg(long)]
    confirm_password: Option<String>,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    full_name: String,
    #[arg(long, default_value = "simple")]
    user_type: String,
    #[arg(long)]
    country: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    payment_reference: Option<String>,
}

impl SignUpArgs {
    fn into_form(self) -> Result<RegistrationForm, CliError> {
        let user_type: UserType = self.user_type.parse().map_err(CliError::InvalidArgument)?;
        let mut form = RegistrationForm::new(user_type);
        form.confirm_password = self.confirm_password.unwrap_or_else(|| self.new_password.clone());
        form.email = self.email;
        form.password = self.new_password;
        form.phone = self.phone;
        form.username = self.username;
        form.full_name = self.full_name;
        form.country = self.country;
        form.city = self.city;
        form.address = self.address;
        form.payment_reference = self.payment_reference.unwrap_or_default();
        Ok(form)
    }
}

#[derive(Args, Debug, Default)]
struct ProfileArgs {
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    bio: Option<String>,
    #[arg(long)]
    avatar_url: Option<String>,
}

impl From<ProfileArgs> for ProfilePatch {
    fn from(args: ProfileArgs) -> Self {
        Self {
            full_name: args.full_name,
            username: args.username,
            phone: args.phone,
            address: args.address,
            city: args.city,
            country: args.country,
            bio: args.bio,
            avatar_url: args.avatar_url,
        }
    }
}

#[derive(Args, Debug)]
struct ProductArgs {
    #[arg(long, default_value = "")]
    query: String,
    #[arg(long, default_value = "")]
    category: String,
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long, default_value = "created_at")]
    sort_by: String,
    #[arg(long, default_value_t = false)]
    ascending: bool,
}

impl From<ProductArgs> for ProductFilters {
    fn from(args: ProductArgs) -> Self {
        let defaults = Self::default();
        Self {
            query: args.query,
            category: args.category,
            country: args.country,
            city: args.city,
            min_price: args.min_price.unwrap_or(defaults.min_price),
            max_price: args.max_price.unwrap_or(defaults.max_price),
            currency: args.currency.unwrap_or(defaults.currency),
            sort_by: args.sort_by,
            ascending: args.ascending,
        }
    }
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct FavoriteArgs {
    #[arg(long)]
    add: Option<String>,
    #[arg(long)]
    remove: Option<String>,
    #[arg(long)]
    toggle: Option<String>,
}

#[derive(Args, Debug)]
struct SupplierArgs {
    #[arg(long, default_value = "")]
    query: String,
    #[arg(long)]
    country: Option<String>,
    /// newest, oldest or name.
    #[arg(long, default_value = "newest")]
    sort: String,
    /// all, verified or new.
    #[arg(long, default_value = "all")]
    tab: String,
    /// List this supplier's active products instead of the directory.
    #[arg(long)]
    products_of: Option<String>,
}

#[derive(Args, Debug)]
struct MyProductsCommand {
    #[command(subcommand)]
    command: MyProductsSubcommand,
}

#[derive(Subcommand, Debug)]
enum MyProductsSubcommand {
    List,
    Add(ProductDraftArgs),
    Update {
        product_id: String,
        #[command(flatten)]
        draft: ProductDraftArgs,
    },
    Hide {
        product_id: String,
    },
    Show {
        product_id: String,
    },
    Delete {
        product_id: String,
    },
}

#[derive(Args, Debug)]
struct ProductDraftArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value = "USD")]
    currency: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    stock: i64,
    #[arg(long = "image")]
    images: Vec<String>,
    #[arg(long, default_value_t = false)]
    hidden: bool,
}

impl From<ProductDraftArgs> for ProductDraft {
    fn from(args: ProductDraftArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            price: args.price,
            currency: args.currency,
            category: args.category,
            stock_quantity: args.stock,
            images: args.images,
            is_active: !args.hidden,
        }
    }
}

#[derive(Args, Debug)]
struct ChatCommand {
    #[command(subcommand)]
    command: ChatSubcommand,
}

#[derive(Subcommand, Debug)]
enum ChatSubcommand {
    List,
    Messages {
        conversation_id: String,
    },
    Send {
        conversation_id: String,
        text: String,
    },
    /// Open (or reuse) a conversation with a supplier about a product.
    Start {
        #[arg(long)]
        supplier_id: String,
        #[arg(long)]
        product_id: String,
        #[arg(long)]
        message: Option<String>,
    },
    /// Print new messages as they arrive, until Ctrl-C.
    Watch {
        conversation_id: String,
    },
}

/// Data services; absent in demo mode.
struct Services {
    catalog: Catalog,
    chat: ChatService,
    suppliers: Suppliers,
}

struct CliContext {
    session: SessionCoordinator,
    services: Option<Services>,
}

impl CliContext {
    fn services(&self, command: &'static str) -> Result<&Services, CliError> {
        self.services.as_ref().ok_or(CliError::DemoUnsupported(command))
    }

    fn user_id(&self) -> Result<String, CliError> {
        self.session
            .current()
            .user_id()
            .map(str::to_owned)
            .ok_or(CliError::NotSignedIn)
    }

    fn identity(&self) -> Result<Identity, CliError> {
        self.session.current().identity().cloned().ok_or(CliError::NotSignedIn)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = connect(cli.demo).await?;
    if let (Some(identifier), Some(password)) = (&cli.identifier, &cli.password) {
        ctx.session.sign_in(identifier, password).await?;
    }
    run(&ctx, cli.command).await
}

const DEMO_EMAIL: &str = "demo@tradhub.test";
const DEMO_PASSWORD: &str = "demo123";

fn demo_account() -> SignUpRequest {
    SignUpRequest {
        email: DEMO_EMAIL.into(),
        password: DEMO_PASSWORD.into(),
        phone: "+221 77 123 45 67".into(),
        username: "demo".into(),
        full_name: "Boutique Démo".into(),
        user_type: UserType::Supplier,
        country: "SN".into(),
        city: "Dakar".into(),
        address: "Marché Sandaga".into(),
        payment_reference: None,
    }
}

async fn connect(demo: bool) -> Result<CliContext, CliError> {
    if demo {
        let backend = DemoBackend::new();
        backend.add_account(&demo_account(), PaymentStatus::Paid)?;
        let backend: Arc<dyn AuthBackend> = Arc::new(backend);
        let session = SessionCoordinator::start(backend).await;
        return Ok(CliContext { session, services: None });
    }

    let config = BackendConfig::from_env()?;
    let backend = SupabaseBackend::new(&config)?;
    let rest = backend.rest().clone();
    let realtime = RealtimeClient::new(&config, rest.clone());
    let services = Services {
        catalog: Catalog::new(rest.clone()),
        suppliers: Suppliers::new(rest.clone()),
        chat: ChatService::new(rest, realtime),
    };
    let session = SessionCoordinator::start(Arc::new(backend)).await;
    Ok(CliContext { session, services: Some(services) })
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Whoami => print_session(&ctx.session.current()),
        Command::SignUp(args) => run_sign_up(ctx, args).await,
        Command::SignOut => {
            ctx.session.sign_out().await?;
            println!("signed out");
            Ok(())
        }
        Command::Profile(args) => run_profile(ctx, args).await,
        Command::Products(args) => {
            let products = ctx
                .services("products")?
                .catalog
                .search(&ProductFilters::from(args))
                .await?;
            print_json(&products)
        }
        Command::Suggest { text } => {
            let titles = ctx.services("suggest")?.catalog.suggestions(&text).await;
            print_json(&titles)
        }
        Command::Countries => match &ctx.services {
            Some(services) => print_json(&services.catalog.countries().await),
            None => print_json(&tradhub::geo::fallback_countries()),
        },
        Command::Cities { country_code } => match &ctx.services {
            Some(services) => print_json(&services.catalog.cities(&country_code).await),
            None => print_json(&tradhub::geo::fallback_cities(&country_code)),
        },
        Command::Favorites(args) => run_favorites(ctx, args).await,
        Command::Suppliers(args) => run_suppliers(ctx, args).await,
        Command::MyProducts(cmd) => run_my_products(ctx, cmd).await,
        Command::Chat(chat) => run_chat(ctx, chat).await,
    }
}

async fn run_sign_up(ctx: &CliContext, args: SignUpArgs) -> Result<(), CliError> {
    let mut form = args.into_form()?;
    while let Advance::Next(step) = form.advance()? {
        tracing::debug!(step = step.number(), total = form.total_steps(), "registration step validated");
    }
    if form.user_type == UserType::Supplier {
        print_supplier_notice(&form.country);
    }
    let request = form.into_request()?;
    let state = ctx.session.sign_up(&request).await?;
    if !state.is_authenticated() {
        eprintln!("account created; confirm the email address, then sign in");
    }
    print_session(&state)
}

fn print_supplier_notice(country: &str) {
    eprintln!("Frais d'inscription : {} USD", registration::SUPPLIER_FEE_USD);
    match registration::payment_options(country) {
        PaymentOptions::MobileMoney(numbers) => eprintln!("Paiement mobile : {}", numbers.join(", ")),
        PaymentOptions::BankTransfer(how) => eprintln!("Virement bancaire : {how}"),
    }
    eprintln!("{}", suppliers::SUPPLIER_PENDING);
}

async fn run_profile(ctx: &CliContext, args: ProfileArgs) -> Result<(), CliError> {
    let patch = ProfilePatch::from(args);
    if patch.is_empty() {
        let state = ctx.session.current();
        return match state.identity() {
            Some(identity) => print_json(&identity_summary(identity)),
            None => Err(CliError::NotSignedIn),
        };
    }
    let state = ctx.session.update_profile(&patch).await?;
    print_session(&state)
}

async fn run_favorites(ctx: &CliContext, args: FavoriteArgs) -> Result<(), CliError> {
    let catalog = &ctx.services("favorites")?.catalog;
    let user_id = ctx.user_id()?;
    match (args.add, args.remove, args.toggle) {
        (Some(product_id), _, _) => {
            catalog.add_favorite(&user_id, &product_id).await?;
            print_json(&json!({ "product_id": product_id, "favorite": true }))
        }
        (_, Some(product_id), _) => {
            catalog.remove_favorite(&user_id, &product_id).await?;
            print_json(&json!({ "product_id": product_id, "favorite": false }))
        }
        (_, _, Some(product_id)) => {
            let favorite = catalog.toggle_favorite(&user_id, &product_id).await?;
            print_json(&json!({ "product_id": product_id, "favorite": favorite }))
        }
        (None, None, None) => print_json(&catalog.favorites(&user_id).await?),
    }
}

async fn run_suppliers(ctx: &CliContext, args: SupplierArgs) -> Result<(), CliError> {
    let service = &ctx.services("suppliers")?.suppliers;
    if let Some(supplier_id) = args.products_of {
        return print_json(&service.active_products(&supplier_id).await?);
    }
    let sort: SupplierSort = args.sort.parse().map_err(CliError::InvalidArgument)?;
    let tab: SupplierTab = args.tab.parse().map_err(CliError::InvalidArgument)?;
    let viewer = ctx.session.current();
    let filters = SupplierFilters { query: args.query, country: args.country, sort }.with_home_region(viewer.identity());
    let entries = service.directory(&filters).await?;
    print_json(&suppliers::filter_tab(entries, tab, OffsetDateTime::now_utc()))
}

async fn run_my_products(ctx: &CliContext, cmd: MyProductsCommand) -> Result<(), CliError> {
    let service = &ctx.services("my-products")?.suppliers;
    let me = ctx.identity()?;
    match cmd.command {
        MyProductsSubcommand::List => print_json(&service.own_products(&me.id).await?),
        MyProductsSubcommand::Add(draft) => {
            let product = service.create_product(&me, &ProductDraft::from(draft)).await?;
            print_json(&product)
        }
        MyProductsSubcommand::Update { product_id, draft } => {
            service
                .update_product(&me, &product_id, &ProductDraft::from(draft))
                .await?;
            print_json(&json!({ "product_id": product_id, "updated": true }))
        }
        MyProductsSubcommand::Hide { product_id } => {
            service.set_active(&me, &product_id, false).await?;
            print_json(&json!({ "product_id": product_id, "is_active": false }))
        }
        MyProductsSubcommand::Show { product_id } => {
            service.set_active(&me, &product_id, true).await?;
            print_json(&json!({ "product_id": product_id, "is_active": true }))
        }
        MyProductsSubcommand::Delete { product_id } => {
            service.delete_product(&me, &product_id).await?;
            print_json(&json!({ "product_id": product_id, "deleted": true }))
        }
    }
}

async fn run_chat(ctx: &CliContext, chat: ChatCommand) -> Result<(), CliError> {
    let service = &ctx.services("chat")?.chat;
    let user_id = ctx.user_id()?;
    match chat.command {
        ChatSubcommand::List => {
            let now = OffsetDateTime::now_utc();
            let rows: Vec<Value> = service
                .conversations(&user_id)
                .await?
                .iter()
                .map(|c| {
                    let other = chat::other_participant(c, &user_id);
                    let name = other.and_then(|p| p.full_name.as_deref()).unwrap_or_default();
                    json!({
                        "id": c.id,
                        "with": name,
                        "initials": chat::initials(name),
                        "product": c.product.as_ref().map(|p| p.title.as_str()),
                        "last_message": c.last_message,
                        "last_message_at": c.last_message_at,
                        "activity": c
                            .last_message_at
                            .as_deref()
                            .and_then(|at| chat::format_activity_time(at, now)),
                    })
                })
                .collect();
            print_json(&rows)
        }
        ChatSubcommand::Messages { conversation_id } => {
            let rows: Vec<Value> = service
                .messages(&conversation_id)
                .await?
                .iter()
                .map(|m| {
                    let mut row = serde_json::to_value(m)?;
                    row["mine"] = json!(m.is_from(&user_id));
                    Ok(row)
                })
                .collect::<Result<_, CliError>>()?;
            print_json(&rows)
        }
        ChatSubcommand::Send { conversation_id, text } => {
            let message = service.send_message(&conversation_id, &user_id, &text).await?;
            print_json(&message)
        }
        ChatSubcommand::Start { supplier_id, product_id, message } => {
            let conversation = service
                .start_conversation(&user_id, &supplier_id, &product_id)
                .await?;
            if let Some(text) = message {
                service.send_message(&conversation.id, &user_id, &text).await?;
            }
            print_json(&conversation)
        }
        ChatSubcommand::Watch { conversation_id } => {
            let mut messages = service.subscribe_to_messages(&conversation_id).await?;
            eprintln!("watching {conversation_id}; Ctrl-C to stop");
            loop {
                tokio::select! {
                    next = messages.recv() => match next {
                        Some(message) => println!("{}", serde_json::to_string(&message)?),
                        None => break,
                    },
                    signal = tokio::signal::ctrl_c() => {
                        signal?;
                        break;
                    }
                }
            }
            messages.close();
            Ok(())
        }
    }
}

fn identity_summary(identity: &Identity) -> Value {
    json!({
        "id": identity.id,
        "email": identity.email,
        "name": identity.display_name(),
        "user_type": identity.user_type().as_str(),
        "payment_status": identity.payment_status(),
        "supplier_features": identity.supplier_features_enabled(),
        "missing_fields": identity.missing_profile_fields(),
        "profile": identity.profile,
    })
}

fn print_session(state: &SessionState) -> Result<(), CliError> {
    match state.identity() {
        Some(identity) => print_json(&identity_summary(identity)),
        None => {
            println!("anonymous");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
