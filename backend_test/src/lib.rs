use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::service::TestFixture`. When both are requested, the client serves
/// the fixture's engine. `#[backend_test(purge)]` builds the fixture with
/// vote choices purged after anonymization.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the parameters to inject and reject invalid function signatures.
    let injected = match check_sig(item_fn.sig.clone()) {
        Ok(injected) => injected,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Pick the fixture configuration.
    let config = match parse_macro_input!(args as Option<Ident>) {
        None => quote! { crate::config::Config::default() },
        Some(arg) if arg == "purge" => quote! {
            crate::config::Config::default()
                .with_choice_retention(crate::config::ChoiceRetention::Purge)
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `purge`")
                .into_compile_error()
                .into();
        }
    };

    // Only build what the test asks for.
    let setup = if injected.needs_fixture() {
        let client = injected.has_client.then(|| {
            quote! {
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_engine(fixture.engine.clone()),
                )
                .await
                .unwrap();
            }
        });
        quote! {
            let fixture = crate::service::TestFixture::with_config(#config).await;
            #client
        }
    } else {
        TokenStream2::new()
    };
    let args = injected.args;

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #setup
                #new_name(#(#args),*).await;
            });
        }
    }
    .into()
}

/// Parameters of a test, in declaration order.
struct Injected {
    args: Vec<TokenStream2>,
    has_client: bool,
    has_fixture: bool,
}

impl Injected {
    fn needs_fixture(&self) -> bool {
        self.has_client || self.has_fixture
    }
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Injected, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Injected {
        args: vec![],
        has_client: false,
        has_fixture: false,
    };

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.get_ident() {
                    if type_ident == "Client" {
                        if injected.has_client {
                            return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                        }
                        injected.has_client = true;
                        injected.args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "TestFixture" {
                        if injected.has_fixture {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `TestFixture`",
                            ));
                        }
                        injected.has_fixture = true;
                        injected.args.push(quote! { fixture });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `fixture_ident: TestFixture`",
        ));
    }

    Ok(injected)
}
