//! Attribute macro behind `recast_testhelpers::test`.

use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    // attributes, visibility and qualifiers ahead of `fn`
    struct Preamble {
        items: Any<Cons<Except<KFn>, TokenTree>>,
    }

    // generics, parameters, return type and where clause
    struct Signature {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct Block {
        items: BraceGroup,
    }

    struct TestFn {
        preamble: Preamble, _fn: KFn, name: Ident,
        signature: Signature, block: Block
    }
}

impl quote::ToTokens for Preamble {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Block {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        tokens.extend(self.items.0.stream())
    }
}

/// Test attribute macro that sets up tracing before running the test.
///
/// Basic usage (expands to `#[test]`):
/// ```ignore
/// #[recast_testhelpers::test]
/// fn my_test() {
///     // tracing is set up automatically
/// }
/// ```
///
/// Any argument is used as the test attribute instead, e.g.
/// `#[recast_testhelpers::test(tokio::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let mut tokens = item.to_token_iter();
    let TestFn {
        preamble,
        _fn,
        name,
        signature,
        block,
    } = match tokens.parse::<TestFn>() {
        Ok(decl) => decl,
        Err(err) => {
            let message = format!("#[test] expects a function with a body: {err}");
            return quote::quote! { ::core::compile_error!(#message); }.into();
        }
    };

    let test_attr = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        let attr = TokenStream::from(attr);
        quote::quote! { #[#attr] }
    };

    quote::quote! {
        #test_attr
        #preamble fn #name #signature {
            ::recast_testhelpers::setup();

            #block
        }
    }
    .into()
}
